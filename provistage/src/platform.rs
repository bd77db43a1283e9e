//! Platform and provider-backend identifiers.

use serde::{Deserialize, Serialize};

/// The cloud backend a stage targets.
///
/// The lowercase name is stable and used for on-disk file naming and
/// logging, so adding a variant must not change existing names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Google Cloud Platform.
    Gcp,
    /// Amazon Web Services.
    Aws,
    /// IBM Cloud.
    IbmCloud,
}

impl Platform {
    /// Returns the stable lowercase name of the platform.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gcp => "gcp",
            Self::Aws => "aws",
            Self::IbmCloud => "ibmcloud",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A provider backend plugin required to apply a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// The Google Cloud provider.
    Google,
    /// The AWS provider.
    Aws,
    /// The IBM Cloud provider.
    IbmCloud,
    /// The ignition-config provider.
    Ignition,
    /// The local-file provider.
    Local,
    /// The time provider.
    Time,
}

impl Provider {
    /// Returns the stable lowercase name of the provider.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Aws => "aws",
            Self::IbmCloud => "ibmcloud",
            Self::Ignition => "ignition",
            Self::Local => "local",
            Self::Time => "time",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
