//! Load-balancer configuration document.
//!
//! The document captures the API load-balancer addresses extracted from the
//! cluster stage's outputs. It is written to the state directory under a
//! fixed name and consumed as an input when the bootstrap ignition asset is
//! regenerated, so that the ignition embeds the correct addresses.

use crate::errors::ProvisionError;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed on-disk filename of the config document within the state directory.
pub const CONFIG_NAME: &str = "lb-config.json";

/// Document name used for the DNS propagation flow.
pub const DNS_CONFIG_NAME: &str = "openshift-lbConfigForDNS";

/// The load-balancer configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbConfig {
    /// The document name.
    pub name: String,
    /// The platform the addresses belong to.
    pub platform: Platform,
    /// The internal API load-balancer address.
    pub internal_api_ip: String,
    /// The external API load-balancer address.
    pub external_api_ip: String,
}

impl LbConfig {
    /// Creates a named config document.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        internal_api_ip: impl Into<String>,
        external_api_ip: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self {
            name: name.into(),
            platform,
            internal_api_ip: internal_api_ip.into(),
            external_api_ip: external_api_ip.into(),
        }
    }

    /// Creates the document consumed by the DNS flow.
    #[must_use]
    pub fn for_dns(
        internal_api_ip: impl Into<String>,
        external_api_ip: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self::new(DNS_CONFIG_NAME, internal_api_ip, external_api_ip, platform)
    }

    /// Returns the (internal, external) API load-balancer address pair.
    #[must_use]
    pub fn api_lb_records(&self) -> (&str, &str) {
        (&self.internal_api_ip, &self.external_api_ip)
    }

    /// Renders the document as pretty-printed JSON.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the document into `state_dir` under [`CONFIG_NAME`],
    /// overwriting any existing file at that path. Returns the written path.
    pub async fn write_to(&self, state_dir: &Path) -> Result<PathBuf, ProvisionError> {
        let path = state_dir.join(CONFIG_NAME);
        let contents = self
            .render()
            .map_err(|source| ProvisionError::malformed_json(&path, source))?;
        tokio::fs::write(&path, contents.as_bytes())
            .await
            .map_err(|source| ProvisionError::io(&path, source))?;
        Ok(path)
    }

    /// Loads the document previously written into `state_dir`.
    pub async fn load_from(state_dir: &Path) -> Result<Self, ProvisionError> {
        let path = state_dir.join(CONFIG_NAME);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| ProvisionError::io(&path, source))?;
        serde_json::from_slice(&data).map_err(|source| ProvisionError::malformed_json(&path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_for_dns_fields() {
        let config = LbConfig::for_dns("10.0.0.5", "1.2.3.4", Platform::Gcp);
        assert_eq!(config.name, DNS_CONFIG_NAME);
        assert_eq!(config.api_lb_records(), ("10.0.0.5", "1.2.3.4"));
        assert_eq!(config.platform, Platform::Gcp);
    }

    #[test]
    fn test_render_contains_both_addresses_and_platform() {
        let config = LbConfig::for_dns("10.0.0.5", "1.2.3.4", Platform::Gcp);
        let rendered = config.render().unwrap();
        assert!(rendered.contains("10.0.0.5"));
        assert!(rendered.contains("1.2.3.4"));
        assert!(rendered.contains("gcp"));
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = LbConfig::for_dns("10.0.0.5", "1.2.3.4", Platform::Gcp);

        let path = config.write_to(dir.path()).await.unwrap();
        let first = tokio::fs::read(&path).await.unwrap();
        config.write_to(dir.path()).await.unwrap();
        let second = tokio::fs::read(&path).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_write_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = LbConfig::for_dns("10.0.0.5", "1.2.3.4", Platform::Gcp);
        config.write_to(dir.path()).await.unwrap();

        let loaded = LbConfig::load_from(dir.path()).await.unwrap();
        assert_eq!(loaded, config);
    }
}
