/// Sparse reference matrix of previously characterised genomes, used to
/// measure how familiar a new genome looks to the specific model.
use crate::utils::io::read_json;
use crate::BinqcError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const REFERENCE_DATA_FILE: &str = "reference_data.json";

/// Compressed sparse rows as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub n_cols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ReferenceMatrix {
    csr: CsrMatrix,
    row_norms: Vec<f64>,
}

impl ReferenceMatrix {
    pub fn load(data_dir: &Path) -> Result<Self, BinqcError> {
        let csr: CsrMatrix = read_json(&data_dir.join(REFERENCE_DATA_FILE))?;
        let matrix = Self::from_csr(csr)?;
        tracing::debug!(
            "Loaded reference matrix: {} genomes x {} features",
            matrix.rows(),
            matrix.cols()
        );
        Ok(matrix)
    }

    pub fn from_csr(csr: CsrMatrix) -> Result<Self, BinqcError> {
        let malformed = |what: &str| BinqcError::Parse(format!("reference matrix: {}", what));

        if csr.indptr.first() != Some(&0) {
            return Err(malformed("indptr must start at 0"));
        }
        if csr.indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(malformed("indptr must be non-decreasing"));
        }
        if csr.indptr.last() != Some(&csr.indices.len()) || csr.indices.len() != csr.data.len() {
            return Err(malformed("indptr, indices and data lengths disagree"));
        }
        if csr.indices.iter().any(|&c| c >= csr.n_cols) {
            return Err(malformed("column index out of range"));
        }

        let row_norms = csr
            .indptr
            .windows(2)
            .map(|w| csr.data[w[0]..w[1]].iter().map(|v| v * v).sum::<f64>().sqrt())
            .collect();

        Ok(Self { csr, row_norms })
    }

    pub fn rows(&self) -> usize {
        self.row_norms.len()
    }

    pub fn cols(&self) -> usize {
        self.csr.n_cols
    }

    /// Highest cosine similarity between `vector` (truncated to the matrix
    /// width) and any reference row. May be negative. A zero vector, or a
    /// matrix with no nonzero row, scores 0.
    pub fn max_cosine_similarity(&self, vector: &[f64]) -> f64 {
        let vector = &vector[..vector.len().min(self.csr.n_cols)];
        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return 0.0;
        }

        let mut best = f64::NEG_INFINITY;
        for (row, window) in self.csr.indptr.windows(2).enumerate() {
            let row_norm = self.row_norms[row];
            if row_norm == 0.0 {
                continue;
            }
            let dot: f64 = self.csr.indices[window[0]..window[1]]
                .iter()
                .zip(&self.csr.data[window[0]..window[1]])
                .filter_map(|(&col, &value)| vector.get(col).map(|v| v * value))
                .sum();
            best = best.max(dot / (row_norm * norm));
        }
        if best.is_finite() {
            best
        } else {
            0.0
        }
    }
}
