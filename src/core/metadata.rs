/// Sequence-derived statistics for one genome's protein set
use crate::bio::sequence::Sequence;
use crate::core::inputs::{genome_id_from_path, read_proteins, GenomeRecord};
use crate::BinqcError;
use serde::{Deserialize, Serialize};

/// The canonical alphabet, in feature order
pub const AMINO_ACIDS: [u8; 20] = *b"ACDEFGHIKLMNPQRSTVWY";

pub const CDS_FIELD: &str = "CDS";
pub const AA_LENGTH_FIELD: &str = "AALength";

/// Metadata field names in their documented order: CDS, AALength, then the
/// twenty amino acids.
pub fn metadata_field_names() -> Vec<String> {
    let mut names = vec![CDS_FIELD.to_string(), AA_LENGTH_FIELD.to_string()];
    names.extend(AMINO_ACIDS.iter().map(|&aa| (aa as char).to_string()));
    names
}

fn amino_acid_index(residue: u8) -> Option<usize> {
    AMINO_ACIDS
        .iter()
        .position(|&aa| aa == residue.to_ascii_uppercase())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeMetadata {
    pub genome_id: String,
    pub cds_count: usize,
    pub aa_length: usize,
    /// Occurrences of each residue in `AMINO_ACIDS` order
    pub aa_counts: [u64; 20],
}

impl GenomeMetadata {
    /// Value of a named metadata field
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            CDS_FIELD => Some(self.cds_count as f64),
            AA_LENGTH_FIELD => Some(self.aa_length as f64),
            _ => {
                let mut bytes = name.bytes();
                match (bytes.next(), bytes.next()) {
                    (Some(residue), None) => {
                        amino_acid_index(residue).map(|i| self.aa_counts[i] as f64)
                    }
                    _ => None,
                }
            }
        }
    }

    /// Fields laid out in `order`; an unknown field name is a schema error
    pub fn values_in(&self, order: &[String]) -> Result<Vec<f64>, BinqcError> {
        order
            .iter()
            .map(|name| {
                self.field(name).ok_or_else(|| {
                    BinqcError::Schema(format!("unknown metadata field '{}'", name))
                })
            })
            .collect()
    }
}

pub struct MetadataCalculator {
    genome_id: String,
    proteins: Vec<Sequence>,
}

impl MetadataCalculator {
    pub fn new(genome_id: impl Into<String>, proteins: Vec<Sequence>) -> Self {
        Self {
            genome_id: genome_id.into(),
            proteins,
        }
    }

    /// Load the record's protein file. The genome name derived from the
    /// protein file must match the record, otherwise fields from different
    /// genomes could end up in one row.
    pub fn from_record(record: &GenomeRecord) -> Result<Self, BinqcError> {
        let file_id = genome_id_from_path(&record.protein_path, ".faa");
        if file_id != record.id {
            return Err(BinqcError::genome(
                &record.id,
                format!(
                    "protein file {} belongs to genome '{}'",
                    record.protein_path.display(),
                    file_id
                ),
            ));
        }

        let proteins = read_proteins(&record.protein_path)?;
        Ok(Self::new(record.id.clone(), proteins))
    }

    pub fn calculate_cds(&self) -> (&str, usize) {
        (&self.genome_id, self.proteins.len())
    }

    pub fn calculate_amino_acid_length(&self) -> (&str, usize) {
        let total = self.proteins.iter().map(Sequence::len).sum();
        (&self.genome_id, total)
    }

    /// Residues outside the canonical alphabet are ignored here but still
    /// counted by `calculate_amino_acid_length`.
    pub fn calculate_amino_acid_counts(&self) -> (&str, [u64; 20]) {
        let mut counts = [0u64; 20];
        for protein in &self.proteins {
            for &residue in &protein.sequence {
                if let Some(i) = amino_acid_index(residue) {
                    counts[i] += 1;
                }
            }
        }
        (&self.genome_id, counts)
    }

    pub fn calculate(&self) -> Result<GenomeMetadata, BinqcError> {
        let (name_cds, cds_count) = self.calculate_cds();
        let (name_len, aa_length) = self.calculate_amino_acid_length();
        let (name_aa, aa_counts) = self.calculate_amino_acid_counts();

        if name_cds != name_len || name_len != name_aa {
            return Err(BinqcError::genome(
                &self.genome_id,
                "inconsistent name information in metadata calculation",
            ));
        }

        Ok(GenomeMetadata {
            genome_id: self.genome_id.clone(),
            cds_count,
            aa_length,
            aa_counts,
        })
    }
}
