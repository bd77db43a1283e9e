//! The variable file consumed by the external apply tool.
//!
//! The sequencer treats the file as opaque JSON; hooks mutate exactly the
//! keys they own and rewrite the full document.

use crate::errors::ProvisionError;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A JSON variable file persisted on disk.
#[derive(Debug, Clone)]
pub struct VariableFile {
    path: PathBuf,
    values: serde_json::Map<String, Value>,
}

impl VariableFile {
    /// Loads and parses the variable file at `path`.
    ///
    /// # Errors
    ///
    /// Pre-existing corruption (unparseable JSON) is fatal and not
    /// auto-repaired.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ProvisionError> {
        let path = path.into();
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| ProvisionError::io(&path, source))?;
        let values: serde_json::Map<String, Value> = serde_json::from_slice(&data)
            .map_err(|source| ProvisionError::malformed_json(&path, source))?;
        Ok(Self { path, values })
    }

    /// Returns the on-disk path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the value for a key, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Sets or overwrites a variable.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Writes the full document back to its original path.
    ///
    /// The write goes through a temporary file followed by a rename, so a
    /// later stage never observes a half-written variable file.
    pub async fn persist(&self) -> Result<(), ProvisionError> {
        let data = serde_json::to_vec(&self.values)
            .map_err(|source| ProvisionError::malformed_json(&self.path, source))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|source| ProvisionError::io(&tmp, source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| ProvisionError::io(&self.path, source))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_load_set_persist_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.json");
        tokio::fs::write(&path, br#"{"ignition_bootstrap": "old"}"#)
            .await
            .unwrap();

        let mut vars = VariableFile::load(&path).await.unwrap();
        vars.set("ignition_bootstrap", Value::String("new".to_string()));
        vars.persist().await.unwrap();

        let reloaded = VariableFile::load(&path).await.unwrap();
        assert_eq!(
            reloaded.get("ignition_bootstrap"),
            Some(&Value::String("new".to_string()))
        );
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.json");
        tokio::fs::write(&path, b"{}").await.unwrap();

        let vars = VariableFile::load(&path).await.unwrap();
        vars.persist().await.unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = VariableFile::load(&path).await.unwrap_err();
        assert!(matches!(err, ProvisionError::MalformedJson { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = VariableFile::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
