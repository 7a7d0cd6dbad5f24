pub mod annotation;
pub mod bio;
pub mod cli;
pub mod core;
pub mod models;
pub mod report;
pub mod tools;
pub mod utils;

pub use crate::core::pipeline::{Predictor, PredictorOptions};
pub use crate::models::ensemble::{EnsemblePredictor, ModelChoice};
pub use crate::report::RunMode;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinqcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("Similarity search error: {0}")]
    Search(String),

    #[error("Feature schema mismatch: {0}")]
    Schema(String),

    #[error("Genome {genome}: {reason}")]
    Genome { genome: String, reason: String },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Model error: {0}")]
    Model(String),
}

impl BinqcError {
    pub fn genome(genome: impl Into<String>, reason: impl Into<String>) -> Self {
        BinqcError::Genome {
            genome: genome.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BinqcError>;
