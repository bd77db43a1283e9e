//! Structured outputs produced by applying a stage.
//!
//! The sequencer treats outputs as opaque; only individual extraction hooks
//! know which keys they need and fail if those are absent.

use crate::errors::ProvisionError;
use serde_json::Value;
use std::path::Path;

/// The parsed JSON outputs of one stage apply.
///
/// Keys are backend-defined (e.g. `cluster_public_ip`); no schema is
/// enforced beyond what a hook asks for.
#[derive(Debug, Clone)]
pub struct StageOutputs {
    stage: String,
    values: serde_json::Map<String, Value>,
}

impl StageOutputs {
    /// Loads stage outputs from the JSON file the external tool wrote.
    pub async fn load(stage: impl Into<String>, path: &Path) -> Result<Self, ProvisionError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| ProvisionError::io(path, source))?;
        Self::from_slice(stage, &data, path)
    }

    /// Parses stage outputs from raw bytes.
    pub fn from_slice(
        stage: impl Into<String>,
        data: &[u8],
        path: &Path,
    ) -> Result<Self, ProvisionError> {
        let values: serde_json::Map<String, Value> = serde_json::from_slice(data)
            .map_err(|source| ProvisionError::malformed_json(path, source))?;
        Ok(Self {
            stage: stage.into(),
            values,
        })
    }

    /// Returns the stage these outputs belong to.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Returns the raw value for a key, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the string value for a key.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingOutput`] if the key is absent and
    /// [`ProvisionError::WrongOutputType`] if it is not a JSON string.
    /// Missing keys are a fatal, non-retryable condition: the upstream
    /// apply produced malformed output.
    pub fn require_str(&self, key: &str) -> Result<&str, ProvisionError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ProvisionError::MissingOutput {
                stage: self.stage.clone(),
                key: key.to_string(),
            })?;
        value.as_str().ok_or_else(|| ProvisionError::WrongOutputType {
            stage: self.stage.clone(),
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn outputs(json: &str) -> StageOutputs {
        StageOutputs::from_slice("cluster", json.as_bytes(), &PathBuf::from("outputs.json"))
            .unwrap()
    }

    #[test]
    fn test_require_str_present() {
        let out = outputs(r#"{"cluster_public_ip": "1.2.3.4"}"#);
        assert_eq!(out.require_str("cluster_public_ip").unwrap(), "1.2.3.4");
    }

    #[test]
    fn test_require_str_missing_names_key() {
        let out = outputs(r#"{"cluster_ip": "10.0.0.5"}"#);
        let err = out.require_str("cluster_public_ip").unwrap_err();
        assert!(err.to_string().contains("cluster_public_ip"));
        assert!(err.to_string().contains("cluster"));
    }

    #[test]
    fn test_require_str_wrong_type() {
        let out = outputs(r#"{"cluster_ip": 42}"#);
        let err = out.require_str("cluster_ip").unwrap_err();
        assert!(matches!(err, ProvisionError::WrongOutputType { .. }));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let err = StageOutputs::from_slice(
            "cluster",
            b"not json",
            &PathBuf::from("outputs.json"),
        )
        .unwrap_err();
        assert!(matches!(err, ProvisionError::MalformedJson { .. }));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs-gcp-cluster.json");
        tokio::fs::write(&path, br#"{"cluster_ip": "10.0.0.5"}"#)
            .await
            .unwrap();

        let out = StageOutputs::load("cluster", &path).await.unwrap();
        assert_eq!(out.require_str("cluster_ip").unwrap(), "10.0.0.5");
    }
}
