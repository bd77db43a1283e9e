//! Error types for the provisioning pipeline.
//!
//! Every failure in the core aborts the current pipeline run and is
//! propagated to the caller; nothing is swallowed or retried at this layer.

use crate::platform::Platform;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A stage output the hook depends on was not produced.
    #[error("failed to read {key} from {stage} stage outputs")]
    MissingOutput {
        /// The stage whose outputs were inspected.
        stage: String,
        /// The missing output key.
        key: String,
    },

    /// A stage output was present but had an unexpected JSON type.
    #[error("output {key} from {stage} stage is not a string")]
    WrongOutputType {
        /// The stage whose outputs were inspected.
        stage: String,
        /// The offending output key.
        key: String,
    },

    /// The asset store failed to fetch or destroy an artifact.
    #[error("failed to {op} {asset}: {source}")]
    AssetStore {
        /// The asset name.
        asset: String,
        /// The store operation that failed.
        op: AssetOp,
        /// The underlying store error.
        source: anyhow::Error,
    },

    /// A fetched asset's content was not valid UTF-8.
    #[error("{asset} content is not valid UTF-8: {source}")]
    AssetEncoding {
        /// The asset name.
        asset: String,
        /// The conversion error.
        source: std::string::FromUtf8Error,
    },

    /// A JSON document on disk could not be parsed.
    ///
    /// Pre-existing corruption of a variable file or outputs file is not
    /// auto-repaired.
    #[error("malformed JSON in {}: {source}", path.display())]
    MalformedJson {
        /// The file that failed to parse.
        path: PathBuf,
        /// The parse error.
        source: serde_json::Error,
    },

    /// Reading or writing a file in the state directory failed.
    #[error("failed to rewrite {}: {source}", path.display())]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An external apply or destroy invocation failed.
    #[error("{context}: {source}")]
    Apply {
        /// Stage-specific description of what was being attempted.
        context: String,
        /// The executor error.
        source: anyhow::Error,
    },

    /// A stage in the pipeline failed, with the sub-step identified.
    #[error("stage {platform}/{stage} failed during {step}: {source}")]
    StageFailed {
        /// The platform the stage targets.
        platform: Platform,
        /// The stage name.
        stage: String,
        /// Which sub-step failed.
        step: StageStep,
        /// The underlying failure.
        source: Box<ProvisionError>,
    },

    /// The stage list failed construction-time validation.
    #[error(transparent)]
    Validation(#[from] StageSetValidationError),
}

impl ProvisionError {
    /// Creates an asset-store fetch error.
    #[must_use]
    pub fn asset_fetch(asset: impl Into<String>, source: anyhow::Error) -> Self {
        Self::AssetStore {
            asset: asset.into(),
            op: AssetOp::Fetch,
            source,
        }
    }

    /// Creates an asset-store destroy error.
    #[must_use]
    pub fn asset_destroy(asset: impl Into<String>, source: anyhow::Error) -> Self {
        Self::AssetStore {
            asset: asset.into(),
            op: AssetOp::Destroy,
            source,
        }
    }

    /// Creates an asset-encoding error.
    #[must_use]
    pub fn asset_encoding(asset: impl Into<String>, source: std::string::FromUtf8Error) -> Self {
        Self::AssetEncoding {
            asset: asset.into(),
            source,
        }
    }

    /// Creates a malformed-JSON error for the given path.
    #[must_use]
    pub fn malformed_json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::MalformedJson {
            path: path.into(),
            source,
        }
    }

    /// Creates an I/O error wrapped with file-path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an external-apply error with a stage-specific message.
    #[must_use]
    pub fn apply(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Apply {
            context: context.into(),
            source,
        }
    }

    /// Wraps a failure with the stage and sub-step it occurred in.
    #[must_use]
    pub fn stage_failed(
        platform: Platform,
        stage: impl Into<String>,
        step: StageStep,
        source: ProvisionError,
    ) -> Self {
        Self::StageFailed {
            platform,
            stage: stage.into(),
            step,
            source: Box::new(source),
        }
    }
}

/// An asset store operation, used for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOp {
    /// Fetching (and possibly regenerating) an asset.
    Fetch,
    /// Destroying a cached asset.
    Destroy,
}

impl std::fmt::Display for AssetOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

/// The sub-step of a stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStep {
    /// The external apply invocation.
    Apply,
    /// The output-extraction hook.
    Extract,
    /// The teardown hook.
    Destroy,
}

impl std::fmt::Display for StageStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::Extract => write!(f, "output extraction"),
            Self::Destroy => write!(f, "teardown"),
        }
    }
}

/// Error raised when a stage list fails validation at construction.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StageSetValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl StageSetValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}
