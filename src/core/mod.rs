pub mod assembler;
pub mod config;
pub mod database;
pub mod inputs;
pub mod metadata;
pub mod paths;
pub mod pipeline;

pub use config::Config;
pub use pipeline::{Predictor, PredictorOptions, RunSummary};
