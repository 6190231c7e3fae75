//! Infrastructure adapter for reading and writing dump artifacts on the local filesystem.

use crate::domain::errors::{BackupError, Result};
use crate::ports::artifact_port::ArtifactPort;
use std::fs;
use std::path::Path;

/// Concrete implementation of `ArtifactPort` for local filesystem storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalArtifactAdapter;

impl LocalArtifactAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactPort for LocalArtifactAdapter {
    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(BackupError::IoError)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| BackupError::ArtifactError {
            path: path.to_path_buf(),
            reason: format!("read failed: {}", e),
        })
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).map_err(|e| BackupError::ArtifactError {
            path: path.to_path_buf(),
            reason: format!("write failed: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_creates_parents() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a/b/c");
        let adapter = LocalArtifactAdapter::new();

        adapter.ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Calling it again on an existing directory is fine.
        adapter.ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_write_then_read_overwrites_in_place() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tenant_pre-data.sql");
        let adapter = LocalArtifactAdapter::new();

        adapter.write_text(&path, "first version, longer").unwrap();
        adapter.write_text(&path, "second").unwrap();
        assert!(adapter.exists(&path));
        assert_eq!(adapter.read_text(&path).unwrap(), "second");
    }

    #[test]
    fn test_missing_artifact_is_reported_with_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("missing.sql");
        let adapter = LocalArtifactAdapter::new();

        assert!(!adapter.exists(&path));
        match adapter.read_text(&path) {
            Err(BackupError::ArtifactError { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
