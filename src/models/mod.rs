/// Trained quality models and the ensemble that arbitrates between them
pub mod ensemble;
pub mod gbt;
pub mod network;
pub mod reference;
pub mod scaler;

pub use ensemble::{EnsemblePredictor, GenomePrediction, ModelChoice, QualityEstimate};
pub use gbt::GradientBoostedTrees;
pub use network::FeedForwardNetwork;
pub use reference::ReferenceMatrix;
pub use scaler::MinMaxScaler;

use crate::utils::io::{read_json, resolve_maybe_gz};
use crate::BinqcError;
use std::path::Path;

pub const GENERAL_COMPLETENESS_MODEL: &str = "general_model_comp.json";
pub const GENERAL_CONTAMINATION_MODEL: &str = "general_model_cont.json";
pub const SPECIFIC_COMPLETENESS_MODEL: &str = "specific_model_comp.json";
pub const SPECIFIC_CONTAMINATION_MODEL: &str = "specific_model_cont.json";
pub const SCALER_FILE: &str = "scaler.json";

pub const MODEL_FILES: [&str; 5] = [
    GENERAL_COMPLETENESS_MODEL,
    GENERAL_CONTAMINATION_MODEL,
    SPECIFIC_COMPLETENESS_MODEL,
    SPECIFIC_CONTAMINATION_MODEL,
    SCALER_FILE,
];

/// A scoring function from a fixed-width feature vector to a raw estimate
pub trait QualityModel: Send + Sync {
    /// Number of features the model consumes, when it declares one
    fn input_width(&self) -> Option<usize>;

    fn predict(&self, features: &[f64]) -> Result<f64, BinqcError>;
}

/// The four trained models plus the scaler feeding the specific pair
pub struct ModelBundle {
    pub general_completeness: Box<dyn QualityModel>,
    pub general_contamination: Box<dyn QualityModel>,
    pub specific_completeness: Box<dyn QualityModel>,
    pub specific_contamination: Box<dyn QualityModel>,
    pub scaler: MinMaxScaler,
}

impl ModelBundle {
    /// Load every model file from `models_dir`. All files are checked for
    /// existence first so a missing model fails before any parsing work.
    pub fn load(models_dir: &Path) -> Result<Self, BinqcError> {
        let missing: Vec<&str> = MODEL_FILES
            .iter()
            .copied()
            .filter(|name| resolve_maybe_gz(&models_dir.join(name)).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(BinqcError::Setup(format!(
                "Model files missing from {}: {}",
                models_dir.display(),
                missing.join(", ")
            )));
        }

        let general_completeness = load_trees(&models_dir.join(GENERAL_COMPLETENESS_MODEL))?;
        let general_contamination = load_trees(&models_dir.join(GENERAL_CONTAMINATION_MODEL))?;
        let specific_completeness = load_network(&models_dir.join(SPECIFIC_COMPLETENESS_MODEL))?;
        let specific_contamination = load_network(&models_dir.join(SPECIFIC_CONTAMINATION_MODEL))?;
        let scaler: MinMaxScaler = read_json(&models_dir.join(SCALER_FILE))?;
        scaler.validate()?;

        Ok(Self {
            general_completeness: Box::new(general_completeness),
            general_contamination: Box::new(general_contamination),
            specific_completeness: Box::new(specific_completeness),
            specific_contamination: Box::new(specific_contamination),
            scaler,
        })
    }
}

fn load_trees(path: &Path) -> Result<GradientBoostedTrees, BinqcError> {
    let model: GradientBoostedTrees = read_json(path)?;
    model.validate()?;
    tracing::debug!("Loaded {} trees from {}", model.trees.len(), path.display());
    Ok(model)
}

fn load_network(path: &Path) -> Result<FeedForwardNetwork, BinqcError> {
    let model: FeedForwardNetwork = read_json(path)?;
    model.validate()?;
    tracing::debug!("Loaded {}-layer network from {}", model.layers.len(), path.display());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_models_listed() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(SCALER_FILE), r#"{"min": [], "scale": []}"#).unwrap();

        let err = ModelBundle::load(tmp.path()).err().unwrap();
        match err {
            BinqcError::Setup(msg) => {
                assert!(msg.contains(GENERAL_COMPLETENESS_MODEL));
                assert!(!msg.contains(SCALER_FILE));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
