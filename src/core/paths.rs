use std::path::PathBuf;
use std::sync::OnceLock;

// Cache the paths to avoid repeated environment lookups
static BINQC_HOME: OnceLock<PathBuf> = OnceLock::new();
static BINQC_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static BINQC_MODELS_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Environment variable overriding the search database location
pub const DATABASE_ENV_VAR: &str = "BINQC_DB";

/// Get the binqc home directory
/// Checks BINQC_HOME environment variable, falls back to ${HOME}/.binqc
pub fn binqc_home() -> PathBuf {
    BINQC_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("BINQC_HOME") {
                PathBuf::from(path)
            } else {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".binqc")
            }
        })
        .clone()
}

/// Get the reference data directory (feature ordering, KEGG tables, reference matrix)
/// Checks BINQC_DATA_DIR environment variable, falls back to BINQC_HOME/data
pub fn binqc_data_dir() -> PathBuf {
    BINQC_DATA_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("BINQC_DATA_DIR") {
                PathBuf::from(path)
            } else {
                binqc_home().join("data")
            }
        })
        .clone()
}

/// Get the trained model directory
/// Checks BINQC_MODELS_DIR environment variable, falls back to BINQC_HOME/models
pub fn binqc_models_dir() -> PathBuf {
    BINQC_MODELS_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("BINQC_MODELS_DIR") {
                PathBuf::from(path)
            } else {
                binqc_home().join("models")
            }
        })
        .clone()
}

/// File recording where the search database lives
pub fn db_location_definition() -> PathBuf {
    binqc_home().join("diamond_path.json")
}

/// Database path from the environment, read fresh on every call
pub fn database_override() -> Option<PathBuf> {
    std::env::var(DATABASE_ENV_VAR)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

/// Check if running with a custom home or data directory
pub fn is_custom_data_dir() -> bool {
    std::env::var("BINQC_DATA_DIR").is_ok() || std::env::var("BINQC_HOME").is_ok()
}

/// Get a human-readable description of the current path configuration
pub fn describe_paths() -> String {
    format!(
        "binqc paths:\n  \
        Home: {}\n  \
        Data: {}\n  \
        Models: {}\n  \
        Database definition: {}\n  \
        Custom: {}",
        binqc_home().display(),
        binqc_data_dir().display(),
        binqc_models_dir().display(),
        db_location_definition().display(),
        if is_custom_data_dir() { "Yes" } else { "No (using defaults)" }
    )
}
