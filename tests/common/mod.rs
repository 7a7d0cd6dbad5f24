//! Common test utilities for binqc integration tests
//!
//! `TestEnvironment` builds a tiny but complete reference data directory and
//! model directory in a temp dir. The fake tools stand in for prodigal and
//! diamond so the whole pipeline runs in-process.
#![allow(dead_code)]

use binqc::annotation::hits::split_namespaced_id;
use binqc::bio::fasta::{parse_fasta, write_fasta};
use binqc::bio::sequence::Sequence;
use binqc::core::config::Config;
use binqc::core::inputs::{BinInput, GenomeRecord};
use binqc::tools::traits::{GeneCallOutcome, GeneCaller, SimilaritySearch};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub const FEATURE_ORDERING: &str = r#"{
    "Metadata": ["CDS", "AALength"],
    "KO_Genes": ["K00001", "K00002", "K00003"],
    "KO_Pathways": ["map00010"],
    "KO_Modules": ["M00001"],
    "KO_Categories": ["Carbohydrate"]
}"#;

pub const GROUP_MAPPING: &str = r#"{
    "pathways": {"map00010": ["K00001", "K00002"]},
    "categories": {"Carbohydrate": {"K00001": 1.0, "K00003": 3.0}}
}"#;

pub const MODULE_DEFINITIONS: &str = r#"{"M00001": "K00001 (K00002,K00003)"}"#;

/// One reference genome: CDS 3, AALength 30, K00001 and K00002 present
pub const REFERENCE_DATA: &str = r#"{
    "n_cols": 5,
    "indptr": [0, 4],
    "indices": [0, 1, 2, 3],
    "data": [3.0, 30.0, 1.0, 1.0]
}"#;

/// 40 below 2.5 CDS, 95 above
pub const GENERAL_COMPLETENESS: &str = r#"{
    "base_score": 0.0,
    "trees": [{"nodes": [
        {"feature": 0, "threshold": 2.5, "left": 1, "right": 2},
        {"leaf": 40.0},
        {"leaf": 95.0}
    ]}]
}"#;

pub const GENERAL_CONTAMINATION: &str = r#"{"trees": [{"nodes": [{"leaf": 2.0}]}]}"#;

/// sigmoid(CDS - 2): 50 at two proteins, about 73.11 at three
pub const SPECIFIC_COMPLETENESS: &str = r#"{"layers": [
    {"weights": [[1.0, 0.0, 0.0, 0.0, 0.0]], "bias": [-2.0], "activation": "sigmoid"}
]}"#;

pub const SPECIFIC_CONTAMINATION: &str = r#"{"layers": [
    {"weights": [[0.0, 0.0, 0.0, 0.0, 0.0]], "bias": [1.5], "activation": "linear"}
]}"#;

/// Identity scaling over all eight feature columns
pub const SCALER: &str = r#"{
    "min": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    "scale": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
}"#;

/// Ten residues, clearly protein
pub const PROTEIN: &str = "MKLEFIPQAS";

/// Test environment that manages temporary directories and cleanup
pub struct TestEnvironment {
    temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    pub bins_dir: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        let models_dir = temp_dir.path().join("models");
        let bins_dir = temp_dir.path().join("bins");
        for dir in [&data_dir, &models_dir, &bins_dir] {
            fs::create_dir_all(dir).expect("Failed to create test dir");
        }

        write(&data_dir, "feature_ordering.json", FEATURE_ORDERING);
        write(&data_dir, "kegg_path_category_mapping.json", GROUP_MAPPING);
        write(&data_dir, "module_definitions.json", MODULE_DEFINITIONS);
        write(&data_dir, "reference_data.json", REFERENCE_DATA);

        write(&models_dir, "general_model_comp.json", GENERAL_COMPLETENESS);
        write(&models_dir, "general_model_cont.json", GENERAL_CONTAMINATION);
        write(&models_dir, "specific_model_comp.json", SPECIFIC_COMPLETENESS);
        write(&models_dir, "specific_model_cont.json", SPECIFIC_CONTAMINATION);
        write(&models_dir, "scaler.json", SCALER);

        Self {
            temp_dir,
            data_dir,
            models_dir,
            bins_dir,
        }
    }

    /// Get a path within the test environment
    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    /// Default config pointed at this environment's data and models
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.paths.data_dir = Some(self.data_dir.clone());
        config.paths.models_dir = Some(self.models_dir.clone());
        config
    }

    /// Write a protein bin whose proteins are named after the KO the fake
    /// search should assign (`K00001_1`), or `orphan_N` for no hit.
    pub fn add_bin(&self, name: &str, protein_ids: &[&str]) -> BinInput {
        let path = self.bins_dir.join(format!("{}.faa", name));
        write_proteins(&path, protein_ids);
        BinInput {
            id: name.to_string(),
            path,
        }
    }

    /// A gene-called record, protein file already in `dir`
    pub fn add_record(&self, dir: &Path, name: &str, protein_ids: &[&str]) -> GenomeRecord {
        let path = dir.join(format!("{}.faa", name));
        write_proteins(&path, protein_ids);
        GenomeRecord {
            id: name.to_string(),
            protein_path: path,
            translation_table: Some(11),
        }
    }
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("Failed to write fixture");
}

pub fn write_proteins(path: &Path, protein_ids: &[&str]) {
    let proteins: Vec<Sequence> = protein_ids
        .iter()
        .map(|id| Sequence::new(id.to_string(), PROTEIN.as_bytes().to_vec()))
        .collect();
    write_fasta(path, &proteins).expect("Failed to write proteins");
}

/// In-process similarity search: the KO is read off the protein name
#[derive(Default)]
pub struct FakeSearch {
    pub separator: String,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn new(separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SimilaritySearch for FakeSearch {
    fn name(&self) -> &str {
        "fake-search"
    }

    fn verify_installation(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn search(&self, query: &Path, output: &Path, work_dir: &Path) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(work_dir.is_dir(), "work dir missing");

        let mut out = fs::File::create(output)?;
        for protein in parse_fasta(query)? {
            let Some((_, protein_id)) = split_namespaced_id(&protein.id, &self.separator) else {
                anyhow::bail!("query id {} is not namespaced", protein.id);
            };
            if let Some(ko) = protein_id.split('_').next().filter(|p| p.starts_with('K')) {
                writeln!(out, "{}\tUniRef100_{}~{}\t92.5\t10", protein.id, protein_id, ko)?;
            }
        }
        Ok(())
    }
}

/// In-process gene caller: bins are already protein FASTA and are copied
/// through. A bin with no sequences reports zero proteins.
pub struct FakeGeneCaller {
    pub table: u8,
}

impl GeneCaller for FakeGeneCaller {
    fn name(&self) -> &str {
        "fake-genes"
    }

    fn verify_installation(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn call_genes(&self, genome: &BinInput, protein_output: &Path) -> anyhow::Result<GeneCallOutcome> {
        let proteins = parse_fasta(&genome.path)?;
        write_fasta(protein_output, &proteins)?;
        Ok(GeneCallOutcome {
            translation_table: self.table,
            protein_count: proteins.len(),
        })
    }
}
