/// Location of the annotated search database
///
/// The location is remembered in a small JSON definition file under the
/// binqc home directory and can be overridden per run.
use crate::core::config::Config;
use crate::core::paths;
use crate::BinqcError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const NOT_SET: &str = "Not Set";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDefinition {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "DBPATH")]
    pub db_path: String,
}

impl Default for DatabaseDefinition {
    fn default() -> Self {
        Self {
            kind: "DIAMONDDB".to_string(),
            db_path: NOT_SET.to_string(),
        }
    }
}

impl DatabaseDefinition {
    pub fn location(&self) -> Option<PathBuf> {
        (self.db_path != NOT_SET && !self.db_path.trim().is_empty())
            .then(|| PathBuf::from(&self.db_path))
    }
}

/// Read the definition file, creating it with an unset location first
pub fn load_definition(path: &Path) -> Result<DatabaseDefinition, BinqcError> {
    if !path.exists() {
        let definition = DatabaseDefinition::default();
        save_definition(path, &definition)?;
        return Ok(definition);
    }

    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| BinqcError::Config(format!("{}: {}", path.display(), e)))
}

pub fn save_definition(path: &Path, definition: &DatabaseDefinition) -> Result<(), BinqcError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(definition)
        .map_err(|e| BinqcError::Config(format!("Failed to serialize database definition: {}", e)))?;
    fs::write(path, contents)?;
    Ok(())
}

/// Record `database` as the default location. The file must exist.
pub fn set_location(definition_path: &Path, database: &Path) -> Result<PathBuf, BinqcError> {
    if !database.is_file() {
        return Err(BinqcError::Setup(format!(
            "Database file not found: {}",
            database.display()
        )));
    }
    let absolute = fs::canonicalize(database)?;

    let mut definition = load_definition(definition_path)?;
    if let Some(previous) = definition.location() {
        tracing::warn!(
            "Replacing previous database location {}",
            previous.display()
        );
    }
    definition.db_path = absolute.display().to_string();
    save_definition(definition_path, &definition)?;
    Ok(absolute)
}

/// Where the database for this run lives: command-line flag, then
/// `BINQC_DB`, then the config file, then the definition file.
pub fn resolve_database(flag: Option<&Path>, config: &Config) -> Result<PathBuf, BinqcError> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = paths::database_override() {
        return Ok(path);
    }
    if let Some(path) = &config.paths.database {
        return Ok(path.clone());
    }

    let definition_path = paths::db_location_definition();
    load_definition(&definition_path)?.location().ok_or_else(|| {
        BinqcError::Setup(
            "No search database location set. Use 'binqc database --setdblocation <path>', \
             --database-path or the BINQC_DB environment variable."
                .to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_created_unset() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("home").join("diamond_path.json");

        let definition = load_definition(&path).unwrap();
        assert!(path.exists());
        assert_eq!(definition.location(), None);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"DBPATH\": \"Not Set\""));
    }

    #[test]
    fn test_set_location() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("diamond_path.json");
        let db = tmp.path().join("uniref100.KO.1.dmnd");

        assert!(matches!(set_location(&path, &db), Err(BinqcError::Setup(_))));

        fs::write(&db, b"db").unwrap();
        let stored = set_location(&path, &db).unwrap();
        assert_eq!(load_definition(&path).unwrap().location(), Some(stored));
    }

    #[test]
    fn test_flag_wins() {
        let mut config = Config::default();
        config.paths.database = Some(PathBuf::from("/from/config.dmnd"));
        let resolved = resolve_database(Some(Path::new("/from/flag.dmnd")), &config).unwrap();
        assert_eq!(resolved, PathBuf::from("/from/flag.dmnd"));
    }
}
