//! JSON document loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use appcell_common::error::{AppcellError, Result};
use serde_json::Value;

/// Loads and parses the JSON document at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or does not parse as
/// JSON. The parser's line/column detail is logged.
pub fn load_document(path: &Path) -> Result<Value> {
    let file = File::open(path).map_err(|e| {
        tracing::debug!(path = %path.display(), error = %e, "cannot open document");
        AppcellError::io(path, e)
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        tracing::error!(
            path = %path.display(),
            line = e.line(),
            column = e.column(),
            error = %e,
            "document is not valid JSON"
        );
        AppcellError::Parse {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_valid_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"process": {"args": []}}"#).expect("write");
        let doc = load_document(&path).expect("load");
        assert!(doc["process"]["args"].is_array());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_document(&dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(err, AppcellError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"process\": ").expect("write");
        let err = load_document(&path).expect_err("malformed");
        assert!(matches!(err, AppcellError::Parse { .. }));
    }
}
