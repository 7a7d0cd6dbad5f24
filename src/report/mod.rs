/// Final quality report: column schema per run mode and the per-genome rows
use crate::models::ensemble::{GenomePrediction, ModelChoice, QualityEstimate};

pub mod text;

pub use text::{render_table, write_feature_vectors, write_report};

/// Which estimates the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    General,
    Specific,
    /// Both models side by side plus the model arbitration would pick
    Both,
    /// One arbitrated estimate per genome
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Completeness,
    Contamination,
    CompletenessGeneral,
    ContaminationGeneral,
    CompletenessSpecific,
    ContaminationSpecific,
    ModelUsed,
    TranslationTable,
    CosineSimilarity,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Completeness => "Completeness",
            Column::Contamination => "Contamination",
            Column::CompletenessGeneral => "Completeness_General",
            Column::ContaminationGeneral => "Contamination_General",
            Column::CompletenessSpecific => "Completeness_Specific",
            Column::ContaminationSpecific => "Contamination_Specific",
            Column::ModelUsed => "Model_Used",
            Column::TranslationTable => "Translation_Table_Used",
            Column::CosineSimilarity => "Cosine_Similarity",
        }
    }

    /// Cell text, with numeric values rounded to `digits` decimals
    pub fn value(&self, record: &PredictionRecord, digits: usize) -> String {
        let number = |v: f64| format!("{:.*}", digits, v);
        match self {
            Column::Name => record.name.clone(),
            Column::Completeness => number(record.chosen.completeness),
            Column::Contamination => number(record.chosen.contamination),
            Column::CompletenessGeneral => number(record.general.completeness),
            Column::ContaminationGeneral => number(record.general.contamination),
            Column::CompletenessSpecific => number(record.specific.completeness),
            Column::ContaminationSpecific => number(record.specific.contamination),
            Column::ModelUsed => record.model_used.label().to_string(),
            Column::TranslationTable => record
                .translation_table
                .map(|t| t.to_string())
                .unwrap_or_default(),
            Column::CosineSimilarity => number(record.similarity),
        }
    }
}

/// Optional diagnostic columns appended after the mode's own columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportExtras {
    pub translation_table: bool,
    pub cosine_similarity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSchema {
    pub columns: Vec<Column>,
}

impl ReportSchema {
    pub fn for_mode(mode: RunMode, extras: ReportExtras) -> Self {
        use Column::*;

        let mut columns = match mode {
            RunMode::General => vec![Name, CompletenessGeneral, ContaminationGeneral],
            RunMode::Specific => vec![Name, CompletenessSpecific, ContaminationSpecific],
            RunMode::Both => vec![
                Name,
                CompletenessGeneral,
                ContaminationGeneral,
                CompletenessSpecific,
                ContaminationSpecific,
                ModelUsed,
            ],
            RunMode::Auto => vec![Name, Completeness, Contamination, ModelUsed],
        };
        if extras.translation_table {
            columns.push(TranslationTable);
        }
        if extras.cosine_similarity {
            columns.push(CosineSimilarity);
        }
        Self { columns }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(Column::header).collect()
    }

    pub fn row(&self, record: &PredictionRecord, digits: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.value(record, digits)).collect()
    }
}

/// One finished report row; never changed once built
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub name: String,
    pub general: QualityEstimate,
    pub specific: QualityEstimate,
    pub chosen: QualityEstimate,
    pub model_used: ModelChoice,
    pub similarity: f64,
    pub translation_table: Option<u8>,
}

impl PredictionRecord {
    pub fn from_prediction(prediction: &GenomePrediction, translation_table: Option<u8>) -> Self {
        Self {
            name: prediction.genome_id.clone(),
            general: prediction.general,
            specific: prediction.specific,
            chosen: prediction.chosen,
            model_used: prediction.model_used,
            similarity: prediction.similarity,
            translation_table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(RunMode::General => vec!["Name", "Completeness_General", "Contamination_General"])]
    #[test_case(RunMode::Specific => vec!["Name", "Completeness_Specific", "Contamination_Specific"])]
    #[test_case(RunMode::Auto => vec!["Name", "Completeness", "Contamination", "Model_Used"])]
    #[test_case(RunMode::Both => vec![
        "Name",
        "Completeness_General",
        "Contamination_General",
        "Completeness_Specific",
        "Contamination_Specific",
        "Model_Used",
    ])]
    fn test_headers_per_mode(mode: RunMode) -> Vec<&'static str> {
        ReportSchema::for_mode(mode, ReportExtras::default()).headers()
    }

    #[test]
    fn test_extras_come_last() {
        let schema = ReportSchema::for_mode(
            RunMode::Auto,
            ReportExtras {
                translation_table: true,
                cosine_similarity: true,
            },
        );
        let headers = schema.headers();
        assert_eq!(&headers[4..], &["Translation_Table_Used", "Cosine_Similarity"]);
    }

    #[test]
    fn test_row_rounding() {
        let record = PredictionRecord {
            name: "bin1".into(),
            general: QualityEstimate { completeness: 87.456, contamination: 1.0 },
            specific: QualityEstimate { completeness: 90.0, contamination: 0.004 },
            chosen: QualityEstimate { completeness: 90.0, contamination: 0.004 },
            model_used: ModelChoice::Specific,
            similarity: 0.98765,
            translation_table: Some(11),
        };
        let schema = ReportSchema::for_mode(
            RunMode::Both,
            ReportExtras {
                translation_table: true,
                cosine_similarity: true,
            },
        );
        assert_eq!(
            schema.row(&record, 2),
            vec![
                "bin1",
                "87.46",
                "1.00",
                "90.00",
                "0.00",
                "Specific (NeuralNetwork)",
                "11",
                "0.99"
            ]
        );
    }
}
