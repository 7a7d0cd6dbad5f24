pub mod io;
pub mod parallel;
pub mod progress;
pub mod workspace;
