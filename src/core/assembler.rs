/// Merge per-genome metadata and annotation features into one fixed-width
/// numeric matrix in model column order.
use crate::annotation::aggregator::AnnotationFeatures;
use crate::annotation::kegg::FeatureOrdering;
use crate::core::metadata::GenomeMetadata;
use crate::BinqcError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub genome_id: String,
    pub cds_count: usize,
    pub values: Vec<f64>,
}

/// Rows sorted by genome id, all with `columns.len()` values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<FeatureRow>) -> Result<Self, BinqcError> {
        if let Some(row) = rows.iter().find(|r| r.values.len() != columns.len()) {
            return Err(BinqcError::Schema(format!(
                "row for {} has {} values but there are {} columns",
                row.genome_id,
                row.values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn check_len(genome: &str, what: &str, got: usize, expected: usize) -> Result<(), BinqcError> {
    if got != expected {
        return Err(BinqcError::Schema(format!(
            "{} for {} has {} entries, expected {}",
            what, genome, got, expected
        )));
    }
    Ok(())
}

/// Build the feature matrix.
///
/// Both inputs are sorted by genome id before the positional merge. A genome
/// present in only one of them, or listed twice, is a schema error: it means
/// an earlier stage lost or duplicated a genome.
pub fn assemble(
    mut metadata: Vec<GenomeMetadata>,
    mut annotations: Vec<AnnotationFeatures>,
    ordering: &FeatureOrdering,
) -> Result<FeatureMatrix, BinqcError> {
    metadata.sort_by(|a, b| a.genome_id.cmp(&b.genome_id));
    annotations.sort_by(|a, b| a.genome_id.cmp(&b.genome_id));

    let meta_ids: BTreeSet<&str> = metadata.iter().map(|m| m.genome_id.as_str()).collect();
    let annotation_ids: BTreeSet<&str> =
        annotations.iter().map(|a| a.genome_id.as_str()).collect();

    if meta_ids.len() != metadata.len() || annotation_ids.len() != annotations.len() {
        return Err(BinqcError::Schema(
            "a genome appears more than once in a pipeline stage".to_string(),
        ));
    }
    if let Some(genome) = meta_ids.difference(&annotation_ids).next() {
        return Err(BinqcError::Schema(format!(
            "genome {} has metadata but no annotation features",
            genome
        )));
    }
    if let Some(genome) = annotation_ids.difference(&meta_ids).next() {
        return Err(BinqcError::Schema(format!(
            "genome {} has annotation features but no metadata",
            genome
        )));
    }

    let rows = metadata
        .iter()
        .zip(&annotations)
        .map(|(meta, annotation)| {
            let id = meta.genome_id.as_str();
            let derived = &annotation.derived;
            check_len(id, "KO counts", annotation.ko_counts.len(), ordering.ko_genes.len())?;
            check_len(id, "pathway features", derived.pathways.len(), ordering.pathways.len())?;
            check_len(id, "module features", derived.modules.len(), ordering.modules.len())?;
            check_len(id, "category features", derived.categories.len(), ordering.categories.len())?;

            let mut values = meta.values_in(&ordering.metadata)?;
            values.reserve(ordering.width() - values.len());
            values.extend(annotation.ko_counts.iter().map(|&c| c as f64));
            values.extend(&derived.pathways);
            values.extend(&derived.modules);
            values.extend(&derived.categories);

            Ok(FeatureRow {
                genome_id: meta.genome_id.clone(),
                cds_count: meta.cds_count,
                values,
            })
        })
        .collect::<Result<Vec<_>, BinqcError>>()?;

    FeatureMatrix::new(ordering.column_names(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::kegg::DerivedFeatures;
    use pretty_assertions::assert_eq;

    fn ordering() -> FeatureOrdering {
        FeatureOrdering {
            metadata: vec!["CDS".into(), "AALength".into()],
            ko_genes: vec!["K1".into(), "K2".into()],
            pathways: vec!["map1".into()],
            modules: vec![],
            categories: vec!["cat".into()],
        }
    }

    fn meta(id: &str, cds: usize) -> GenomeMetadata {
        GenomeMetadata {
            genome_id: id.to_string(),
            cds_count: cds,
            aa_length: cds * 100,
            aa_counts: [0; 20],
        }
    }

    fn annotation(id: &str, counts: Vec<u32>, pathway: f64) -> AnnotationFeatures {
        AnnotationFeatures {
            genome_id: id.to_string(),
            ko_counts: counts,
            derived: DerivedFeatures {
                pathways: vec![pathway],
                modules: vec![],
                categories: vec![0.25],
            },
        }
    }

    #[test]
    fn test_assemble_sorts_before_merging() {
        let matrix = assemble(
            vec![meta("b", 2), meta("a", 1)],
            vec![annotation("a", vec![1, 0], 0.5), annotation("b", vec![0, 3], 1.0)],
            &ordering(),
        )
        .unwrap();

        assert_eq!(matrix.columns(), &["CDS", "AALength", "K1", "K2", "map1", "cat"]);
        assert_eq!(matrix.rows()[0].genome_id, "a");
        assert_eq!(matrix.rows()[0].values, vec![1.0, 100.0, 1.0, 0.0, 0.5, 0.25]);
        assert_eq!(matrix.rows()[1].values, vec![2.0, 200.0, 0.0, 3.0, 1.0, 0.25]);
    }

    #[test]
    fn test_missing_genome_is_schema_error() {
        let err = assemble(
            vec![meta("a", 1), meta("b", 1)],
            vec![annotation("a", vec![0, 0], 0.0)],
            &ordering(),
        )
        .unwrap_err();
        assert!(matches!(err, BinqcError::Schema(msg) if msg.contains("genome b")));
    }

    #[test]
    fn test_wrong_ko_width_is_schema_error() {
        let err = assemble(
            vec![meta("a", 1)],
            vec![annotation("a", vec![0, 0, 0], 0.0)],
            &ordering(),
        )
        .unwrap_err();
        assert!(matches!(err, BinqcError::Schema(_)));
    }
}
