use crate::BinqcError;
use serde::{Deserialize, Serialize};

/// Min-max feature scaler fitted offline: `x * scale + min` per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub scale: Vec<f64>,
}

impl MinMaxScaler {
    pub fn validate(&self) -> Result<(), BinqcError> {
        if self.min.len() != self.scale.len() {
            return Err(BinqcError::Model(format!(
                "scaler has {} offsets but {} scale factors",
                self.min.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.scale.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, BinqcError> {
        if row.len() != self.width() {
            return Err(BinqcError::Schema(format!(
                "scaler expects {} features, got {}",
                self.width(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.scale.iter().zip(&self.min))
            .map(|(x, (scale, min))| x * scale + min)
            .collect())
    }
}
