/// Output directory layout for a single prediction run
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROTEIN_DIR_NAME: &str = "protein_files";
pub const SEARCH_DIR_NAME: &str = "diamond_output";
pub const REPORT_FILE_NAME: &str = "quality_report.tsv";
pub const VECTOR_DUMP_FILE_NAME: &str = "feature_vectors.tsv";

#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub protein_dir: PathBuf,
    pub search_dir: PathBuf,
}

impl OutputLayout {
    /// Prepare `root` for a run. A non-empty directory is refused unless
    /// `overwrite` is set, in which case its contents are removed first.
    pub fn prepare(root: &Path, overwrite: bool) -> Result<Self> {
        ensure_empty_dir(root, overwrite)?;

        let layout = Self {
            root: root.to_path_buf(),
            protein_dir: root.join(PROTEIN_DIR_NAME),
            search_dir: root.join(SEARCH_DIR_NAME),
        };

        for dir in [&layout.protein_dir, &layout.search_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }

        Ok(layout)
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE_NAME)
    }

    pub fn vector_dump_path(&self) -> PathBuf {
        self.root.join(VECTOR_DUMP_FILE_NAME)
    }

    pub fn protein_file(&self, genome_id: &str) -> PathBuf {
        self.protein_dir.join(format!("{}.faa", genome_id))
    }

    /// Delete gene-calling and search intermediates, keeping the report
    pub fn remove_intermediates(&self) -> Result<()> {
        for dir in [&self.protein_dir, &self.search_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir)
                    .with_context(|| format!("Failed to remove {:?}", dir))?;
            }
        }
        Ok(())
    }
}

fn ensure_empty_dir(dir: &Path, overwrite: bool) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read output directory: {:?}", dir))?
        .peekable();

    if entries.peek().is_none() {
        return Ok(());
    }

    if !overwrite {
        return Err(crate::BinqcError::Setup(format!(
            "Output directory must be empty: {}. Use --force to overwrite it.",
            dir.display()
        ))
        .into());
    }

    tracing::warn!("Clearing existing output directory {}", dir.display());
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
