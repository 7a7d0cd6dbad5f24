/// Prodigal gene calling with codon-table selection
use super::traits::{GeneCallOutcome, GeneCaller};
use super::Tool;
use crate::bio::fasta::{parse_fasta, write_fasta};
use crate::bio::sequence::Sequence;
use crate::core::config::GeneCallingConfig;
use crate::core::inputs::{read_proteins, BinInput};
use crate::BinqcError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const STANDARD_TABLE: u8 = 11;
pub const ALTERNATE_TABLE: u8 = 4;

#[derive(Debug, Clone, Copy)]
pub struct ProdigalOptions {
    /// Genomes shorter than this many bases are called in metagenome mode
    pub meta_mode_threshold: usize,
    pub table4_density_gain: f64,
    pub table11_density_ceiling: f64,
}

impl From<&GeneCallingConfig> for ProdigalOptions {
    fn from(config: &GeneCallingConfig) -> Self {
        Self {
            meta_mode_threshold: config.meta_mode_threshold,
            table4_density_gain: config.table4_density_gain,
            table11_density_ceiling: config.table11_density_ceiling,
        }
    }
}

/// Coding density: translated residues back in bases over genome length
pub fn coding_density(proteins: &[Sequence], genome_bases: usize) -> f64 {
    if genome_bases == 0 {
        return 0.0;
    }
    let residues: usize = proteins.iter().map(Sequence::len).sum();
    (3 * residues) as f64 / genome_bases as f64
}

/// Table 4 wins only when it codes noticeably more of a genome that table
/// 11 leaves sparse.
pub fn choose_translation_table(density_11: f64, density_4: f64, options: &ProdigalOptions) -> u8 {
    if density_4 > density_11 + options.table4_density_gain
        && density_11 < options.table11_density_ceiling
    {
        ALTERNATE_TABLE
    } else {
        STANDARD_TABLE
    }
}

pub struct ProdigalRunner {
    binary_path: PathBuf,
    options: ProdigalOptions,
}

impl ProdigalRunner {
    pub fn new(options: ProdigalOptions) -> Result<Self> {
        let version = Tool::Prodigal.verify()?;
        tracing::debug!("Using {}", version);
        Ok(Self {
            binary_path: PathBuf::from(Tool::Prodigal.binary_name()),
            options,
        })
    }

    fn run(&self, input: &Path, work_dir: &Path, table: u8, meta: bool) -> Result<Vec<Sequence>> {
        let proteins = work_dir.join(format!("proteins_{}.faa", table));
        let genes = work_dir.join(format!("genes_{}.gff", table));

        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-i")
            .arg(input)
            .arg("-a")
            .arg(&proteins)
            .arg("-o")
            .arg(&genes)
            .arg("-f")
            .arg("gff")
            .arg("-g")
            .arg(table.to_string())
            .arg("-q");
        if meta {
            cmd.arg("-p").arg("meta");
        }

        tracing::trace!("Running {:?}", cmd);
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .context("Failed to start prodigal")?;

        if !output.status.success() {
            return Err(BinqcError::Tool(format!(
                "prodigal failed on {} with exit code {:?}: {}",
                input.display(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into());
        }

        if !proteins.exists() {
            return Ok(Vec::new());
        }
        Ok(read_proteins(&proteins)?)
    }
}

impl GeneCaller for ProdigalRunner {
    fn name(&self) -> &str {
        "prodigal"
    }

    fn verify_installation(&self) -> Result<()> {
        Tool::Prodigal.verify()?;
        Ok(())
    }

    fn call_genes(&self, genome: &BinInput, protein_output: &Path) -> Result<GeneCallOutcome> {
        let contigs = parse_fasta(&genome.path)
            .with_context(|| format!("Failed to read bin {}", genome.path.display()))?;
        let genome_bases: usize = contigs.iter().map(Sequence::len).sum();
        if genome_bases == 0 {
            return Err(BinqcError::genome(&genome.id, "bin contains no sequence").into());
        }

        let work_dir = tempfile::tempdir()?;
        // prodigal cannot read compressed input
        let input = work_dir.path().join("genome.fna");
        write_fasta(&input, &contigs)?;

        let (translation_table, proteins) = if genome_bases < self.options.meta_mode_threshold {
            let proteins = self.run(&input, work_dir.path(), STANDARD_TABLE, true)?;
            (STANDARD_TABLE, proteins)
        } else {
            let proteins_11 = self.run(&input, work_dir.path(), STANDARD_TABLE, false)?;
            let proteins_4 = self.run(&input, work_dir.path(), ALTERNATE_TABLE, false)?;
            let density_11 = coding_density(&proteins_11, genome_bases);
            let density_4 = coding_density(&proteins_4, genome_bases);
            let table = choose_translation_table(density_11, density_4, &self.options);
            tracing::debug!(
                "{}: coding density {:.3} (table 11) vs {:.3} (table 4), using table {}",
                genome.id,
                density_11,
                density_4,
                table
            );
            if table == ALTERNATE_TABLE {
                (table, proteins_4)
            } else {
                (table, proteins_11)
            }
        };

        write_fasta(protein_output, &proteins)?;
        Ok(GeneCallOutcome {
            translation_table,
            protein_count: proteins.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const OPTIONS: ProdigalOptions = ProdigalOptions {
        meta_mode_threshold: 100_000,
        table4_density_gain: 0.05,
        table11_density_ceiling: 0.70,
    };

    #[test_case(0.60, 0.70 => 4 ; "sparse table 11 with clear table 4 gain")]
    #[test_case(0.60, 0.63 => 11 ; "gain below threshold")]
    #[test_case(0.80, 0.95 => 11 ; "table 11 already dense")]
    #[test_case(0.90, 0.50 => 11 ; "table 4 worse")]
    fn test_choose_translation_table(d11: f64, d4: f64) -> u8 {
        choose_translation_table(d11, d4, &OPTIONS)
    }

    #[test]
    fn test_coding_density() {
        let proteins = vec![Sequence::new("p".into(), b"MKV".to_vec())];
        assert!((coding_density(&proteins, 18) - 0.5).abs() < 1e-12);
        assert_eq!(coding_density(&proteins, 0), 0.0);
    }
}
