use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub prediction: PredictionConfig,
    pub gene_calling: GeneCallingConfig,
    pub paths: PathsConfig,
}

/// Similarity search thresholds, fixed for the whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub query_cover: u32,
    pub subject_cover: u32,
    pub percent_id: u32,
    pub evalue: f64,
    /// Genomes per search invocation
    pub chunk_size: usize,
    pub block_size: f64,
    pub lowmem_block_size: f64,
    /// Joins genome id and protein id in concatenated queries
    pub header_separator: String,
    /// Splits the database hit into reference id and KO id
    pub annotation_separator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// CDS count per completeness point below which a genome counts as reduced
    pub aa_ratio_cutoff: f64,
    pub round_digits: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneCallingConfig {
    /// Genomes shorter than this (in bases) are called in metagenomic mode
    pub meta_mode_threshold: usize,
    pub table4_density_gain: f64,
    pub table11_density_ceiling: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: Option<PathBuf>,
    pub models_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query_cover: 80,
            subject_cover: 80,
            percent_id: 30,
            evalue: 1e-5,
            chunk_size: 500,
            block_size: 2.0,
            lowmem_block_size: 0.5,
            header_separator: "Ω".to_string(),
            annotation_separator: "~".to_string(),
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            aa_ratio_cutoff: 10.0,
            round_digits: 2,
        }
    }
}

impl Default for GeneCallingConfig {
    fn default() -> Self {
        Self {
            meta_mode_threshold: 100_000,
            table4_density_gain: 0.05,
            table11_density_ceiling: 0.70,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), crate::BinqcError> {
        if self.search.chunk_size == 0 {
            return Err(crate::BinqcError::Config(
                "search.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.search.header_separator.is_empty() || self.search.annotation_separator.is_empty() {
            return Err(crate::BinqcError::Config(
                "search separators must not be empty".to_string(),
            ));
        }
        if !(self.prediction.aa_ratio_cutoff.is_finite() && self.prediction.aa_ratio_cutoff >= 0.0) {
            return Err(crate::BinqcError::Config(
                "prediction.aa_ratio_cutoff must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(super::paths::binqc_data_dir)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.paths
            .models_dir
            .clone()
            .unwrap_or_else(super::paths::binqc_models_dir)
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, crate::BinqcError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::BinqcError::Config(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), crate::BinqcError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::BinqcError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binqc.toml");
        std::fs::write(&path, "[search]\nchunk_size = 50\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.search.chunk_size, 50);
        assert_eq!(config.search.query_cover, 80);
        assert_eq!(config.search.header_separator, "Ω");
        assert_eq!(config.prediction.round_digits, 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binqc.toml");
        let mut config = default_config();
        config.prediction.aa_ratio_cutoff = 7.5;
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap().prediction.aa_ratio_cutoff, 7.5);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binqc.toml");
        std::fs::write(&path, "[search]\nchunk_size = 0\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(crate::BinqcError::Config(_))
        ));
    }
}
