//! Reference-vector fixture
//!
//! A JSON table mapping model name to its expected embedding vector, loaded
//! once at run start and read-only for the run's lifetime. A malformed
//! fixture is a configuration-class error and aborts before any case runs.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Name-keyed table of reference embedding vectors
pub type ReferenceVectors = BTreeMap<String, Vec<f64>>;

/// Load the reference-vector table from `path`
///
/// # Errors
///
/// Returns [`Error::Fixture`] when the file cannot be read, is not a valid
/// name-keyed table of numeric sequences, or contains an empty vector.
pub fn load_reference_vectors(path: &Path) -> Result<ReferenceVectors> {
    let fixture_err = |reason: String| Error::Fixture {
        path: path.display().to_string(),
        reason,
    };

    let data = std::fs::read_to_string(path).map_err(|e| fixture_err(e.to_string()))?;
    let table: ReferenceVectors =
        serde_json::from_str(&data).map_err(|e| fixture_err(e.to_string()))?;

    for (model, vector) in &table {
        if vector.is_empty() {
            return Err(fixture_err(format!("empty reference vector for {model}")));
        }
    }

    debug!(models = table.len(), path = %path.display(), "loaded reference vectors");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write fixture");
        file
    }

    #[test]
    fn test_load_valid_fixture() {
        let file = write_fixture(
            r#"{"all-minilm":[0.1,-0.2,0.3],"nomic-embed-text":[1.0,0.0,0.5]}"#,
        );
        let table = load_reference_vectors(file.path()).expect("loads");
        assert_eq!(table.len(), 2);
        assert_eq!(table["all-minilm"], vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_missing_file_is_fixture_error() {
        let err = load_reference_vectors(Path::new("/nonexistent/embed.json"))
            .expect_err("missing file");
        assert!(matches!(err, Error::Fixture { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_malformed_json_is_fixture_error() {
        let file = write_fixture(r#"{"all-minilm": "not a vector"}"#);
        let err = load_reference_vectors(file.path()).expect_err("malformed");
        assert!(matches!(err, Error::Fixture { .. }));
    }

    #[test]
    fn test_empty_vector_is_rejected() {
        let file = write_fixture(r#"{"all-minilm":[]}"#);
        let err = load_reference_vectors(file.path()).expect_err("empty vector");
        assert!(err.to_string().contains("all-minilm"));
    }

    #[test]
    fn test_empty_table_loads() {
        let file = write_fixture("{}");
        let table = load_reference_vectors(file.path()).expect("loads");
        assert!(table.is_empty());
    }
}
