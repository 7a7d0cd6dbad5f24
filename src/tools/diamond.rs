/// DIAMOND blastp wrapper for KO annotation
use super::traits::SimilaritySearch;
use super::Tool;
use crate::core::config::SearchConfig;
use crate::BinqcError;
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Fixed per-run search settings
#[derive(Debug, Clone)]
pub struct DiamondOptions {
    pub database: PathBuf,
    pub threads: usize,
    pub query_cover: u32,
    pub subject_cover: u32,
    pub percent_id: u32,
    pub evalue: f64,
    pub block_size: f64,
}

impl DiamondOptions {
    pub fn from_config(config: &SearchConfig, database: PathBuf, threads: usize, lowmem: bool) -> Self {
        Self {
            database,
            threads: threads.max(1),
            query_cover: config.query_cover,
            subject_cover: config.subject_cover,
            percent_id: config.percent_id,
            evalue: config.evalue,
            block_size: if lowmem {
                config.lowmem_block_size
            } else {
                config.block_size
            },
        }
    }

    /// Arguments for one blastp invocation, top hit only
    pub fn blastp_args(&self, query: &Path, output: &Path, work_dir: &Path) -> Vec<String> {
        vec![
            "blastp".to_string(),
            "--outfmt".to_string(),
            "6".to_string(),
            "--max-target-seqs".to_string(),
            "1".to_string(),
            "--query".to_string(),
            query.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "--threads".to_string(),
            self.threads.to_string(),
            "--db".to_string(),
            self.database.display().to_string(),
            "--query-cover".to_string(),
            self.query_cover.to_string(),
            "--subject-cover".to_string(),
            self.subject_cover.to_string(),
            "--id".to_string(),
            self.percent_id.to_string(),
            "--evalue".to_string(),
            self.evalue.to_string(),
            "--block-size".to_string(),
            self.block_size.to_string(),
            "--tmpdir".to_string(),
            work_dir.display().to_string(),
            "--quiet".to_string(),
        ]
    }
}

pub struct DiamondRunner {
    binary_path: PathBuf,
    options: DiamondOptions,
}

impl DiamondRunner {
    /// Check the tool and database before any genome is processed
    pub fn new(options: DiamondOptions) -> Result<Self> {
        let runner = Self {
            binary_path: PathBuf::from(Tool::Diamond.binary_name()),
            options,
        };
        runner.verify_installation()?;
        Ok(runner)
    }

    pub fn options(&self) -> &DiamondOptions {
        &self.options
    }
}

impl SimilaritySearch for DiamondRunner {
    fn name(&self) -> &str {
        "diamond"
    }

    fn verify_installation(&self) -> Result<()> {
        let version = Tool::Diamond.verify()?;
        tracing::debug!("Using {}", version);

        if !self.options.database.is_file() {
            return Err(BinqcError::Setup(format!(
                "DIAMOND database not found at {}. Set it with 'binqc database --setdblocation <path>'",
                self.options.database.display()
            ))
            .into());
        }
        Ok(())
    }

    fn search(&self, query: &Path, output: &Path, work_dir: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(self.options.blastp_args(query, output, work_dir));
        tracing::debug!("Running {:?}", cmd);

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().context("Failed to start diamond blastp")?;

        // Drain stderr in a thread so a chatty run cannot block on a full pipe
        let stderr_handle = child.stderr.take().map(|stderr| {
            std::thread::spawn(move || {
                let mut captured = Vec::new();
                for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                    tracing::trace!("diamond: {}", line);
                    captured.push(line);
                }
                captured
            })
        });

        let status = child.wait().context("Failed to wait for diamond blastp")?;
        let stderr_lines = stderr_handle
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(BinqcError::Tool(format!(
                "diamond blastp failed with exit code {:?}: {}",
                status.code(),
                stderr_lines.join("\n")
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    #[test]
    fn test_lowmem_switches_block_size() {
        let config = Config::default();
        let normal = DiamondOptions::from_config(&config.search, PathBuf::from("db.dmnd"), 8, false);
        let lowmem = DiamondOptions::from_config(&config.search, PathBuf::from("db.dmnd"), 0, true);
        assert_eq!(normal.block_size, 2.0);
        assert_eq!(lowmem.block_size, 0.5);
        assert_eq!(lowmem.threads, 1);
    }

    #[test]
    fn test_blastp_args() {
        let config = Config::default();
        let options = DiamondOptions::from_config(&config.search, PathBuf::from("db.dmnd"), 4, false);
        let args = options.blastp_args(Path::new("q.faa"), Path::new("out.tsv"), Path::new("tmp"));

        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .map(|i| args[i + 1].clone())
        };
        assert_eq!(args[0], "blastp");
        assert_eq!(value_of("--max-target-seqs").as_deref(), Some("1"));
        assert_eq!(value_of("--query-cover").as_deref(), Some("80"));
        assert_eq!(value_of("--subject-cover").as_deref(), Some("80"));
        assert_eq!(value_of("--id").as_deref(), Some("30"));
        assert_eq!(value_of("--evalue").as_deref(), Some("0.00001"));
        assert_eq!(value_of("--threads").as_deref(), Some("4"));
        assert_eq!(value_of("--tmpdir").as_deref(), Some("tmp"));
        assert_eq!(args.last().map(String::as_str), Some("--quiet"));
    }
}
