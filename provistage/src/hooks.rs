//! Extraction and teardown strategies.
//!
//! Each stage carries two strategy objects: an output-extraction hook run
//! after a successful apply, and a teardown hook run during bootstrap
//! destroy. Platforms supply custom strategies where they need them; the
//! defaults here are a no-op extraction and a full destroy of the stage's
//! resources.

use crate::asset::AssetStore;
use crate::errors::ProvisionError;
use crate::executor::{ApplyOption, Executor};
use crate::stage::StageSpec;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared collaborators and directories handed to hooks.
///
/// Hooks never make network calls directly; all external communication is
/// delegated to the asset store and the executor.
#[derive(Clone)]
pub struct HookContext {
    /// The state directory holding variable files, outputs, and assets.
    pub state_dir: PathBuf,
    /// The external tool's working directory.
    pub tool_dir: PathBuf,
    /// The asset store owning generated artifacts.
    pub asset_store: Arc<dyn AssetStore>,
    /// The external apply/destroy executor.
    pub executor: Arc<dyn Executor>,
}

impl Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("state_dir", &self.state_dir)
            .field("tool_dir", &self.tool_dir)
            .finish_non_exhaustive()
    }
}

/// Strategy run after a stage's apply to propagate its outputs.
///
/// Implementations read the stage's outputs file, derive new configuration,
/// regenerate dependent assets through the store, and rewrite the variable
/// file consumed by the next stage. All disk mutations must be complete
/// when the future resolves; the sequencer starts the next apply only after
/// that point.
#[async_trait]
pub trait ExtractHook: Send + Sync + Debug {
    /// Runs the extraction for `stage`.
    async fn extract(
        &self,
        stage: &StageSpec,
        ctx: &HookContext,
        outputs_path: &Path,
        vars_path: &Path,
    ) -> Result<(), ProvisionError>;
}

/// The default extraction: nothing to propagate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpExtract;

#[async_trait]
impl ExtractHook for NoOpExtract {
    async fn extract(
        &self,
        _stage: &StageSpec,
        _ctx: &HookContext,
        _outputs_path: &Path,
        _vars_path: &Path,
    ) -> Result<(), ProvisionError> {
        Ok(())
    }
}

/// Strategy run for a stage during bootstrap teardown.
#[async_trait]
pub trait DestroyHook: Send + Sync + Debug {
    /// Tears down the stage's resources, given the same variable files the
    /// stage was applied with.
    async fn destroy(
        &self,
        stage: &StageSpec,
        ctx: &HookContext,
        var_files: &[PathBuf],
    ) -> Result<(), ProvisionError>;
}

/// The default teardown: destroy all of the stage's resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullDestroy;

#[async_trait]
impl DestroyHook for FullDestroy {
    async fn destroy(
        &self,
        stage: &StageSpec,
        ctx: &HookContext,
        var_files: &[PathBuf],
    ) -> Result<(), ProvisionError> {
        let opts: Vec<ApplyOption> = var_files
            .iter()
            .cloned()
            .map(ApplyOption::VarFile)
            .collect();
        ctx.executor
            .destroy(&ctx.state_dir, stage, &ctx.tool_dir, &opts)
            .await
            .map_err(|source| {
                ProvisionError::apply(
                    format!(
                        "failed to destroy stage {}/{}",
                        stage.platform(),
                        stage.name()
                    ),
                    source,
                )
            })
    }
}
