//! Loads expectation files from a directory into a [`Backup`].

use super::backup::Backup;
use super::types::{Expectation, ExpectationDefinition, ExpectationError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read expectations directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read expectation file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed expectation file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid expectation in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ExpectationError,
    },
}

/// Reads `*.json`, `*.yaml` and `*.yml` files, one expectation per file.
pub struct ExpectationLoader;

impl ExpectationLoader {
    /// Load every expectation file in `dir` (non-recursive), sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Backup, LoadError> {
        let read_dir = |source| LoadError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_dir)? {
            let path = entry.map_err(read_dir)?.path();
            if path.is_file() && Format::of(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();

        let mut expectations = Vec::with_capacity(files.len());
        for path in &files {
            debug!("Loading expectation from {}", path.display());
            expectations.push(Self::load_file(path)?);
        }

        info!(
            "Loaded {} expectation(s) from {}",
            expectations.len(),
            dir.display()
        );
        Ok(Backup::from_expectations(expectations))
    }

    pub fn load_file(path: &Path) -> Result<Expectation, LoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| LoadError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let definition: ExpectationDefinition = match Format::of(path) {
            Some(Format::Yaml) => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
        };

        Expectation::try_from(definition).map_err(|source| LoadError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::ExpectationStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_dir_sorted_by_file_name() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"priority": 2, "request": {"url": {"isEqualTo": "/b"}}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("a.yaml"),
            "priority: 1\nrequest:\n  url:\n    isEqualTo: /a\n",
        )
        .unwrap();
        fs::write(dir.path().join("c.yml"), "priority: 3\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let backup = ExpectationLoader::load_dir(dir.path()).unwrap();
        let priorities: Vec<_> = backup.expectations().iter().map(|e| e.priority()).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
        assert!(backup.expectations().iter().all(|e| e.id().is_some()));
    }

    #[test]
    fn test_file_ids_are_replaced() {
        let dir = TempDir::new().unwrap();
        let shared = "6f1c2a90-3b4d-4e5f-8a7b-1c2d3e4f7e11";
        for name in ["a.json", "b.json"] {
            fs::write(
                dir.path().join(name),
                format!(r#"{{"id": "{shared}", "request": {{"url": {{"isEqualTo": "/{name}"}}}}}}"#),
            )
            .unwrap();
        }

        let backup = ExpectationLoader::load_dir(dir.path()).unwrap();
        let ids = backup.ids();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(!ids.contains(&shared.parse().unwrap()));

        let store = ExpectationStore::new();
        store.replace_all(&backup);
        assert!(store.remove(ids[0]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_dir_gives_empty_backup() {
        let dir = TempDir::new().unwrap();
        assert!(ExpectationLoader::load_dir(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = ExpectationLoader::load_dir(&dir.path().join("missing"));
        assert!(matches!(result, Err(LoadError::ReadDir { .. })));
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let err = ExpectationLoader::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_invalid_definition_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("conflict.json"),
            r#"{"proxyTo": "http://localhost:1", "fault": "timeout"}"#,
        )
        .unwrap();
        let err = ExpectationLoader::load_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Invalid {
                source: ExpectationError::ConflictingResponse,
                ..
            }
        ));
    }
}
