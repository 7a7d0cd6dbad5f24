/// Two-model ensemble with similarity-driven arbitration
///
/// Both models score every genome. The similarity of the genome's scaled
/// feature vector to the reference matrix, its apparent completeness and how
/// reduced its gene set looks then decide which of the two estimates is
/// reported.
use super::{ModelBundle, QualityModel, ReferenceMatrix};
use crate::core::assembler::{FeatureMatrix, FeatureRow};
use crate::BinqcError;
use rayon::prelude::*;
use std::fmt;

/// Lower completeness bound (exclusive) and the novelty ratio a genome must
/// stay below for the specific model to be trusted in that band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbitrationBand {
    pub completeness_above: f64,
    pub novelty_below: f64,
}

/// Evaluated top-down; the first band whose bound is exceeded decides
pub const ARBITRATION_BANDS: [ArbitrationBand; 6] = [
    ArbitrationBand { completeness_above: 90.0, novelty_below: 160.0 },
    ArbitrationBand { completeness_above: 80.0, novelty_below: 165.0 },
    ArbitrationBand { completeness_above: 70.0, novelty_below: 165.0 },
    ArbitrationBand { completeness_above: 60.0, novelty_below: 170.0 },
    ArbitrationBand { completeness_above: 50.0, novelty_below: 175.0 },
    ArbitrationBand { completeness_above: 40.0, novelty_below: 175.0 },
];

/// Genomes below this mean completeness with a low amino-acid ratio are
/// treated as highly reduced
pub const REDUCED_GENOME_COMPLETENESS: f64 = 55.0;

/// The specific completeness network ends in a sigmoid
pub const SPECIFIC_COMPLETENESS_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelChoice {
    General,
    Specific,
}

impl ModelChoice {
    pub fn label(&self) -> &'static str {
        match self {
            ModelChoice::General => "General (GradientBoost)",
            ModelChoice::Specific => "Specific (NeuralNetwork)",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Clamp a raw model output into `[0, 100]`; NaN becomes 0
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 100.0)
    }
}

/// General completeness over squared similarity; +inf when the genome is
/// orthogonal to every reference
pub fn novelty_ratio(general_completeness: f64, similarity: f64) -> f64 {
    let denominator = similarity * similarity;
    if denominator == 0.0 {
        f64::INFINITY
    } else {
        general_completeness / denominator
    }
}

/// Coding sequences per completeness point; +inf at zero completeness so a
/// genome with no estimate is never classed as reduced
pub fn amino_acid_ratio(cds_count: usize, mean_completeness: f64) -> f64 {
    if mean_completeness == 0.0 {
        f64::INFINITY
    } else {
        cds_count as f64 / mean_completeness
    }
}

pub fn arbitrate(
    mean_completeness: f64,
    novelty: f64,
    aa_ratio: f64,
    aa_ratio_cutoff: f64,
) -> ModelChoice {
    if mean_completeness < REDUCED_GENOME_COMPLETENESS && aa_ratio < aa_ratio_cutoff {
        return ModelChoice::General;
    }

    for band in &ARBITRATION_BANDS {
        if mean_completeness > band.completeness_above {
            return if novelty < band.novelty_below {
                ModelChoice::Specific
            } else {
                ModelChoice::General
            };
        }
    }

    ModelChoice::Specific
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityEstimate {
    pub completeness: f64,
    pub contamination: f64,
}

impl QualityEstimate {
    pub fn clamped(completeness: f64, contamination: f64) -> Self {
        Self {
            completeness: clamp_score(completeness),
            contamination: clamp_score(contamination),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenomePrediction {
    pub genome_id: String,
    pub general: QualityEstimate,
    pub specific: QualityEstimate,
    /// Best cosine similarity against the reference matrix
    pub similarity: f64,
    pub novelty_ratio: f64,
    pub aa_ratio: f64,
    pub model_used: ModelChoice,
    pub chosen: QualityEstimate,
    /// The min-max scaled feature vector
    pub scaled_features: Vec<f64>,
}

pub struct EnsemblePredictor {
    models: ModelBundle,
    reference: ReferenceMatrix,
    /// Leading scaled features the specific models consume
    specific_width: usize,
    aa_ratio_cutoff: f64,
}

impl EnsemblePredictor {
    pub fn new(
        models: ModelBundle,
        reference: ReferenceMatrix,
        specific_width: usize,
        aa_ratio_cutoff: f64,
    ) -> Result<Self, BinqcError> {
        for (name, model) in [
            ("specific completeness", &models.specific_completeness),
            ("specific contamination", &models.specific_contamination),
        ] {
            if let Some(width) = model.input_width() {
                if width != specific_width {
                    return Err(BinqcError::Schema(format!(
                        "{} model takes {} features but metadata and KO columns give {}",
                        name, width, specific_width
                    )));
                }
            }
        }

        Ok(Self {
            models,
            reference,
            specific_width,
            aa_ratio_cutoff,
        })
    }

    /// Score every row of `matrix`, preserving its row order
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<GenomePrediction>, BinqcError> {
        let width = matrix.width();
        if self.models.scaler.width() != width {
            return Err(BinqcError::Schema(format!(
                "scaler was fitted on {} features but the matrix has {}",
                self.models.scaler.width(),
                width
            )));
        }
        if self.specific_width > width {
            return Err(BinqcError::Schema(format!(
                "specific models need {} features but the matrix has {}",
                self.specific_width, width
            )));
        }
        if self.reference.cols() > width {
            return Err(BinqcError::Schema(format!(
                "reference matrix has {} features but the matrix has {}",
                self.reference.cols(),
                width
            )));
        }

        matrix
            .rows()
            .par_iter()
            .map(|row| self.predict_row(row))
            .collect()
    }

    fn predict_row(&self, row: &FeatureRow) -> Result<GenomePrediction, BinqcError> {
        let general = QualityEstimate::clamped(
            self.models.general_completeness.predict(&row.values)?,
            self.models.general_contamination.predict(&row.values)?,
        );

        let scaled_features = self.models.scaler.transform(&row.values)?;
        let specific_input = &scaled_features[..self.specific_width];
        let specific = QualityEstimate::clamped(
            self.models.specific_completeness.predict(specific_input)? * SPECIFIC_COMPLETENESS_SCALE,
            self.models.specific_contamination.predict(specific_input)?,
        );

        let similarity = self.reference.max_cosine_similarity(&scaled_features);
        let novelty = novelty_ratio(general.completeness, similarity);
        let mean_completeness = (general.completeness + specific.completeness) / 2.0;
        let aa_ratio = amino_acid_ratio(row.cds_count, mean_completeness);
        let model_used = arbitrate(mean_completeness, novelty, aa_ratio, self.aa_ratio_cutoff);

        tracing::trace!(
            "{}: mean completeness {:.2}, similarity {:.3}, novelty {:.1}, aa ratio {:.2} -> {}",
            row.genome_id,
            mean_completeness,
            similarity,
            novelty,
            aa_ratio,
            model_used
        );

        Ok(GenomePrediction {
            genome_id: row.genome_id.clone(),
            general,
            specific,
            similarity,
            novelty_ratio: novelty,
            aa_ratio,
            model_used,
            chosen: match model_used {
                ModelChoice::General => general,
                ModelChoice::Specific => specific,
            },
            scaled_features,
        })
    }
}
