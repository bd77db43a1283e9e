//! Recording mocks for the executor and asset store.

use crate::asset::{AssetRef, AssetStore};
use crate::executor::{ApplyOption, Executor};
use crate::platform::Platform;
use crate::stage::StageSpec;
use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

/// The kind of executor invocation recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallVerb {
    /// An apply invocation.
    Apply,
    /// A destroy invocation.
    Destroy,
}

/// One recorded executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorCall {
    /// Whether this was an apply or a destroy.
    pub verb: CallVerb,
    /// The platform passed.
    pub platform: Platform,
    /// The stage name passed.
    pub stage: String,
    /// The variable options passed, in order.
    pub opts: Vec<ApplyOption>,
}

/// A mock executor that records calls and emulates the external tool
/// writing the stage outputs file on apply. Scripted outputs are written
/// in the flat shape real executors produce after output flattening.
#[derive(Debug, Default)]
pub struct MockExecutor {
    calls: Mutex<Vec<ExecutorCall>>,
    apply_failures: Mutex<HashMap<String, String>>,
    destroy_failures: Mutex<HashMap<String, String>>,
    scripted_outputs: Mutex<HashMap<String, serde_json::Value>>,
}

impl MockExecutor {
    /// Creates a mock executor with no scripted failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the outputs JSON the given stage's apply will produce.
    pub fn set_outputs(&self, stage: &str, outputs: serde_json::Value) {
        self.scripted_outputs
            .lock()
            .insert(stage.to_string(), outputs);
    }

    /// Scripts a failure for the given stage's apply.
    pub fn fail_apply_on(&self, stage: &str, message: &str) {
        self.apply_failures
            .lock()
            .insert(stage.to_string(), message.to_string());
    }

    /// Scripts a failure for the given stage's destroy.
    pub fn fail_destroy_on(&self, stage: &str, message: &str) {
        self.destroy_failures
            .lock()
            .insert(stage.to_string(), message.to_string());
    }

    /// Returns every recorded invocation, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded stage names for calls of `verb`, in order.
    #[must_use]
    pub fn stages_called(&self, verb: CallVerb) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.verb == verb)
            .map(|call| call.stage.clone())
            .collect()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn apply(
        &self,
        state_dir: &Path,
        stage: &StageSpec,
        _tool_dir: &Path,
        opts: &[ApplyOption],
    ) -> anyhow::Result<()> {
        self.calls.lock().push(ExecutorCall {
            verb: CallVerb::Apply,
            platform: stage.platform(),
            stage: stage.name().to_string(),
            opts: opts.to_vec(),
        });
        if let Some(message) = self.apply_failures.lock().get(stage.name()) {
            bail!("{message}");
        }
        let outputs = self
            .scripted_outputs
            .lock()
            .get(stage.name())
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        let path = state_dir.join(stage.outputs_filename());
        tokio::fs::write(&path, serde_json::to_vec(&outputs)?).await?;
        Ok(())
    }

    async fn destroy(
        &self,
        _state_dir: &Path,
        stage: &StageSpec,
        _tool_dir: &Path,
        opts: &[ApplyOption],
    ) -> anyhow::Result<()> {
        self.calls.lock().push(ExecutorCall {
            verb: CallVerb::Destroy,
            platform: stage.platform(),
            stage: stage.name().to_string(),
            opts: opts.to_vec(),
        });
        if let Some(message) = self.destroy_failures.lock().get(stage.name()) {
            bail!("{message}");
        }
        Ok(())
    }
}

/// A mock asset store with deterministic per-asset content and an
/// operation log.
#[derive(Debug, Default)]
pub struct MockAssetStore {
    contents: Mutex<HashMap<String, Vec<u8>>>,
    operations: Mutex<Vec<String>>,
    fetch_failures: Mutex<HashMap<String, String>>,
}

impl MockAssetStore {
    /// Creates an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the content served for an asset on fetch.
    pub fn set_content(&self, asset: &AssetRef, content: impl Into<Vec<u8>>) {
        self.contents
            .lock()
            .insert(asset.name().to_string(), content.into());
    }

    /// Scripts a fetch failure for an asset.
    pub fn fail_fetch_on(&self, asset: &AssetRef, message: &str) {
        self.fetch_failures
            .lock()
            .insert(asset.name().to_string(), message.to_string());
    }

    /// Returns the operation log, entries like `"destroy Bootstrap
    /// Ignition Config"`, in call order.
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().clone()
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    async fn fetch(&self, asset: &AssetRef) -> anyhow::Result<Vec<u8>> {
        self.operations.lock().push(format!("fetch {}", asset.name()));
        if let Some(message) = self.fetch_failures.lock().get(asset.name()) {
            bail!("{message}");
        }
        match self.contents.lock().get(asset.name()) {
            Some(content) => Ok(content.clone()),
            None => bail!("no content scripted for {}", asset.name()),
        }
    }

    async fn destroy(&self, asset: &AssetRef) -> anyhow::Result<()> {
        self.operations
            .lock()
            .push(format!("destroy {}", asset.name()));
        Ok(())
    }
}
