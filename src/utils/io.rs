/// Reading reference files that may be shipped gzip-compressed
use crate::BinqcError;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Open `path` for buffered reading, decompressing when it ends in `.gz`
pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>, BinqcError> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// `path` itself, or `path.gz` when only the compressed variant exists
pub fn resolve_maybe_gz(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }
    let mut gz = path.as_os_str().to_owned();
    gz.push(".gz");
    let gz = PathBuf::from(gz);
    gz.exists().then_some(gz)
}

/// Deserialize a JSON reference file (plain or `.gz`)
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BinqcError> {
    let resolved = resolve_maybe_gz(path).ok_or_else(|| {
        BinqcError::Setup(format!("Reference file not found: {}", path.display()))
    })?;
    let reader = open_maybe_gz(&resolved)?;
    serde_json::from_reader(reader)
        .map_err(|e| BinqcError::Parse(format!("{}: {}", resolved.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_read_json_falls_back_to_gz() {
        let tmp = tempfile::tempdir().unwrap();
        let gz_path = tmp.path().join("table.json.gz");
        let mut encoder = GzEncoder::new(File::create(&gz_path).unwrap(), Compression::default());
        encoder.write_all(br#"{"a": [1, 2]}"#).unwrap();
        encoder.finish().unwrap();

        let value: serde_json::Value = read_json(&tmp.path().join("table.json")).unwrap();
        assert_eq!(value["a"][1], 2);
    }

    #[test]
    fn test_read_json_missing_is_setup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result: Result<serde_json::Value, _> = read_json(&tmp.path().join("nope.json"));
        assert!(matches!(result, Err(BinqcError::Setup(_))));
    }
}
