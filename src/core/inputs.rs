/// Input bin discovery and the per-genome records that flow through a run
use crate::bio::fasta::parse_fasta;
use crate::bio::sequence::Sequence;
use crate::BinqcError;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One input assembly (or protein file when genes are supplied)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinInput {
    pub id: String,
    pub path: PathBuf,
}

/// A genome after gene calling: immutable from here on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeRecord {
    pub id: String,
    pub protein_path: PathBuf,
    /// Codon table picked by the gene caller; `None` for user-supplied proteins
    pub translation_table: Option<u8>,
}

/// A genome dropped from the run, with the reason shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedGenome {
    pub genome: String,
    pub reason: String,
}

impl SkippedGenome {
    pub fn new(genome: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            genome: genome.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SkippedGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.genome, self.reason)
    }
}

impl From<SkippedGenome> for BinqcError {
    fn from(skipped: SkippedGenome) -> Self {
        BinqcError::genome(skipped.genome, skipped.reason)
    }
}

/// Per-genome stage result: either the stage output or a recorded exclusion
pub type GenomeOutcome<T> = std::result::Result<T, SkippedGenome>;

/// Derive the genome identifier from a file name: `.gz` is dropped, then the
/// bin extension when it matches, otherwise the last extension.
pub fn genome_id_from_path(path: &Path, extension: &str) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);

    let ext = if extension.starts_with('.') || extension.is_empty() {
        extension.to_string()
    } else {
        format!(".{}", extension)
    };

    if !ext.is_empty() {
        if let Some(stem) = name.strip_suffix(ext.as_str()) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }

    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string())
}

fn matches_extension(path: &Path, extension: &str) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.ends_with(extension)
}

/// Collect bins from directories (filtered by extension) and explicit files.
///
/// Zero-byte files are skipped with a warning. Finding no bins, or two bins
/// that map to the same genome id, is a setup error.
pub fn discover_bins(inputs: &[PathBuf], extension: &str) -> Result<Vec<BinInput>, BinqcError> {
    let mut paths = Vec::new();

    for input in inputs {
        if input.is_dir() {
            for entry in fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() && matches_extension(&path, extension) {
                    paths.push(path);
                }
            }
        } else if input.is_file() {
            paths.push(input.clone());
        } else {
            return Err(BinqcError::Setup(format!(
                "Input does not exist: {}",
                input.display()
            )));
        }
    }

    paths.sort();
    paths.dedup();

    let mut bins = Vec::with_capacity(paths.len());
    let mut seen = HashSet::new();
    for path in paths {
        if fs::metadata(&path)?.len() == 0 {
            tracing::warn!("Skipping bin {} as it has a size of 0 bytes.", path.display());
            continue;
        }

        let id = genome_id_from_path(&path, extension);
        if !seen.insert(id.clone()) {
            return Err(BinqcError::Setup(format!(
                "Two input files map to the same genome name '{}'",
                id
            )));
        }
        bins.push(BinInput { id, path });
    }

    if bins.is_empty() {
        return Err(BinqcError::Setup(format!(
            "No bins found. Check the extension ({}) used to identify bins.",
            extension
        )));
    }

    Ok(bins)
}

/// Read a genome's protein set, dropping trailing stop markers
pub fn read_proteins(path: &Path) -> Result<Vec<Sequence>, BinqcError> {
    let mut proteins = parse_fasta(path)?;
    for protein in &mut proteins {
        protein.trim_stop();
    }
    proteins.retain(|p| !p.is_empty());
    Ok(proteins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genome_id_from_path() {
        assert_eq!(genome_id_from_path(Path::new("/x/bin.1.fna"), ".fna"), "bin.1");
        assert_eq!(genome_id_from_path(Path::new("/x/bin.1.fna.gz"), ".fna"), "bin.1");
        assert_eq!(genome_id_from_path(Path::new("bin_7.fasta"), "fasta"), "bin_7");
        assert_eq!(genome_id_from_path(Path::new("bin_7.fa"), ".fna"), "bin_7");
    }

    #[test]
    fn test_discover_bins_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.fna"), ">c\nACGT\n").unwrap();
        fs::write(tmp.path().join("a.fna"), ">c\nACGT\n").unwrap();
        fs::write(tmp.path().join("empty.fna"), "").unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let bins = discover_bins(&[tmp.path().to_path_buf()], ".fna").unwrap();
        let ids: Vec<_> = bins.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_discover_bins_none_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover_bins(&[tmp.path().to_path_buf()], ".fna").unwrap_err();
        assert!(matches!(err, BinqcError::Setup(_)));
    }

    #[test]
    fn test_discover_bins_duplicate_ids() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.fna"), ">c\nACGT\n").unwrap();
        fs::write(tmp.path().join("a.fna.gz"), "not really gz").unwrap();
        let err = discover_bins(&[tmp.path().to_path_buf()], ".fna").unwrap_err();
        assert!(matches!(err, BinqcError::Setup(_)));
    }

    #[test]
    fn test_read_proteins_trims_stops() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("g.faa");
        fs::write(&path, ">p1\nMKV*\n>p2\n*\n").unwrap();
        let proteins = read_proteins(&path).unwrap();
        assert_eq!(proteins.len(), 1);
        assert_eq!(proteins[0].sequence, b"MKV");
    }
}
