/// External bioinformatics tools driven by the pipeline
pub mod diamond;
pub mod prodigal;
pub mod traits;

pub use diamond::{DiamondOptions, DiamondRunner};
pub use prodigal::{ProdigalOptions, ProdigalRunner};
pub use traits::{GeneCallOutcome, GeneCaller, SimilaritySearch};

use crate::BinqcError;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Executables the pipeline shells out to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Prodigal,
    Diamond,
}

impl Tool {
    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Prodigal => "prodigal",
            Tool::Diamond => "diamond",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tool::Prodigal => "Prodigal",
            Tool::Diamond => "DIAMOND",
        }
    }

    /// Arguments that make the tool print its version and exit 0
    fn version_args(&self) -> &'static [&'static str] {
        match self {
            Tool::Prodigal => &["-v"],
            Tool::Diamond => &["version"],
        }
    }

    /// First match for the binary on `PATH`
    pub fn find_in_path(&self) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(self.binary_name()))
            .find(|candidate| candidate.is_file())
    }

    /// Make sure the tool is installed and runs; a setup error otherwise
    pub fn verify(&self) -> Result<String, BinqcError> {
        let output = Command::new(self.binary_name())
            .args(self.version_args())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                BinqcError::Setup(format!(
                    "{} ({}) is not available on PATH: {}",
                    self.display_name(),
                    self.binary_name(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(BinqcError::Setup(format!(
                "{} returned exit code {:?} when asked for its version",
                self.display_name(),
                output.status.code()
            )));
        }

        // prodigal writes its version to stderr
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&text).trim().to_string())
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Tool {
    type Err = BinqcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prodigal" => Ok(Tool::Prodigal),
            "diamond" => Ok(Tool::Diamond),
            _ => Err(BinqcError::Config(format!("Unknown tool: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        assert_eq!(Tool::Diamond.binary_name(), "diamond");
        assert_eq!(Tool::Prodigal.to_string(), "Prodigal");
        assert_eq!("DIAMOND".parse::<Tool>().unwrap(), Tool::Diamond);
        assert!("lambda".parse::<Tool>().is_err());
    }
}
