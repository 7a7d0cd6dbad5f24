/// Trait definitions for tool abstractions
///
/// The pipeline talks to gene callers and similarity searches only through
/// these traits, so tests can swap in in-process fakes.
use crate::core::inputs::BinInput;
use anyhow::Result;
use std::path::Path;

/// What a gene caller produced for one genome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneCallOutcome {
    /// Codon table the proteins were translated with
    pub translation_table: u8,
    pub protein_count: usize,
}

/// Predicts protein-coding genes in a nucleotide assembly
pub trait GeneCaller: Send + Sync {
    fn name(&self) -> &str;

    /// Verify that the tool is properly installed
    fn verify_installation(&self) -> Result<()>;

    /// Write the translated proteins of `genome` to `protein_output`
    fn call_genes(&self, genome: &BinInput, protein_output: &Path) -> Result<GeneCallOutcome>;
}

/// Protein similarity search against a fixed annotated database
pub trait SimilaritySearch: Send + Sync {
    fn name(&self) -> &str;

    /// Verify that the tool and its database are usable
    fn verify_installation(&self) -> Result<()>;

    /// Search `query` (FASTA) and write tab-separated top hits to `output`.
    /// `work_dir` is private to this invocation.
    fn search(&self, query: &Path, output: &Path, work_dir: &Path) -> Result<()>;
}
