pub mod database;
pub mod predict;
