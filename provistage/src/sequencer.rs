//! The stage sequencer.
//!
//! Walks a platform's ordered list of stage descriptors, applying each in
//! turn and running its output-extraction hook before the next stage
//! begins. Execution is strictly sequential: every external invocation and
//! every hook is awaited to completion, which is what guarantees that stage
//! N's disk mutations are durable before stage N+1's apply reads them.

use crate::asset::AssetStore;
use crate::errors::{ProvisionError, StageSetValidationError, StageStep};
use crate::executor::{ApplyOption, Executor};
use crate::hooks::HookContext;
use crate::stage::StageSpec;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Filename of the shared base variable file within the state directory.
pub const BASE_VARS_FILENAME: &str = "terraform.tfvars.json";

/// Identifier of one pipeline run, attached to log events for correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Executes a platform's stages in order with no best-effort continuation.
///
/// A failure of either apply or extraction aborts the pipeline immediately
/// and surfaces the error; retries, if any, belong to the executor.
pub struct StageSequencer {
    stages: Vec<StageSpec>,
    state_dir: PathBuf,
    tool_dir: PathBuf,
    executor: Arc<dyn Executor>,
    asset_store: Arc<dyn AssetStore>,
    run_id: RunId,
}

impl std::fmt::Debug for StageSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSequencer")
            .field("stages", &self.stages)
            .field("state_dir", &self.state_dir)
            .field("tool_dir", &self.tool_dir)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl StageSequencer {
    /// Creates a sequencer over an ordered stage list.
    ///
    /// # Errors
    ///
    /// Stage ordering is an explicit invariant: construction fails if the
    /// list is empty or a stage name repeats within a platform.
    pub fn new(
        stages: Vec<StageSpec>,
        state_dir: impl Into<PathBuf>,
        tool_dir: impl Into<PathBuf>,
        executor: Arc<dyn Executor>,
        asset_store: Arc<dyn AssetStore>,
    ) -> Result<Self, StageSetValidationError> {
        if stages.is_empty() {
            return Err(StageSetValidationError::new("stage list cannot be empty"));
        }
        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert((stage.platform(), stage.name().to_string())) {
                return Err(StageSetValidationError::new(format!(
                    "duplicate stage name {}/{}",
                    stage.platform(),
                    stage.name()
                ))
                .with_stages(vec![stage.name().to_string()]));
            }
        }
        Ok(Self {
            stages,
            state_dir: state_dir.into(),
            tool_dir: tool_dir.into(),
            executor,
            asset_store,
            run_id: RunId::new(),
        })
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns this run's identifier.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Returns the path of the shared base variable file.
    #[must_use]
    pub fn base_vars_path(&self) -> PathBuf {
        self.state_dir.join(BASE_VARS_FILENAME)
    }

    fn hook_context(&self) -> HookContext {
        HookContext {
            state_dir: self.state_dir.clone(),
            tool_dir: self.tool_dir.clone(),
            asset_store: self.asset_store.clone(),
            executor: self.executor.clone(),
        }
    }

    /// Applies every stage in order.
    ///
    /// Each stage's apply receives the base variable file plus the outputs
    /// files of all earlier stages; after a successful apply the stage's
    /// extraction hook runs to completion before the next stage begins.
    pub async fn provision(&self) -> Result<(), ProvisionError> {
        let base_vars = self.base_vars_path();
        let ctx = self.hook_context();
        let mut var_file_opts = vec![ApplyOption::VarFile(base_vars.clone())];

        for stage in &self.stages {
            info!(
                run_id = %self.run_id,
                platform = %stage.platform(),
                stage = stage.name(),
                providers = ?stage.providers(),
                "applying stage"
            );
            self.executor
                .apply(&self.state_dir, stage, &self.tool_dir, &var_file_opts)
                .await
                .map_err(|source| {
                    ProvisionError::stage_failed(
                        stage.platform(),
                        stage.name(),
                        StageStep::Apply,
                        ProvisionError::apply(
                            format!(
                                "failed to apply stage {}/{}",
                                stage.platform(),
                                stage.name()
                            ),
                            source,
                        ),
                    )
                })?;

            let outputs_path = self.state_dir.join(stage.outputs_filename());
            stage
                .extract_hook()
                .extract(stage, &ctx, &outputs_path, &base_vars)
                .await
                .map_err(|source| {
                    ProvisionError::stage_failed(
                        stage.platform(),
                        stage.name(),
                        StageStep::Extract,
                        source,
                    )
                })?;

            // Later stages consume this stage's outputs as variables.
            if file_exists(&outputs_path).await {
                var_file_opts.push(ApplyOption::VarFile(outputs_path));
            }

            info!(
                run_id = %self.run_id,
                platform = %stage.platform(),
                stage = stage.name(),
                "stage complete"
            );
        }
        Ok(())
    }

    /// Tears down the bootstrap resources.
    ///
    /// Walks the stages in reverse order and runs the teardown hook of
    /// every stage marked for bootstrap destroy, handing each hook the same
    /// variable files the stages were applied with. A hook failure aborts
    /// the walk; the caller decides whether to proceed further.
    pub async fn destroy_bootstrap(&self) -> Result<(), ProvisionError> {
        let ctx = self.hook_context();
        let mut var_files = vec![self.base_vars_path()];
        for stage in &self.stages {
            let outputs_path = self.state_dir.join(stage.outputs_filename());
            if file_exists(&outputs_path).await {
                var_files.push(outputs_path);
            }
        }

        for stage in self.stages.iter().rev() {
            if !stage.destroy_with_bootstrap() {
                continue;
            }
            info!(
                run_id = %self.run_id,
                platform = %stage.platform(),
                stage = stage.name(),
                "tearing down stage"
            );
            stage
                .destroy_hook()
                .destroy(stage, &ctx, &var_files)
                .await
                .map_err(|source| {
                    ProvisionError::stage_failed(
                        stage.platform(),
                        stage.name(),
                        StageStep::Destroy,
                        source,
                    )
                })?;
        }
        Ok(())
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{DestroyHook, ExtractHook};
    use crate::platform::{Platform, Provider};
    use crate::testing::{CallVerb, MockAssetStore, MockExecutor};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct RecordingExtract {
        ran: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ExtractHook for RecordingExtract {
        async fn extract(
            &self,
            stage: &StageSpec,
            _ctx: &HookContext,
            _outputs_path: &Path,
            _vars_path: &Path,
        ) -> Result<(), ProvisionError> {
            self.ran.lock().push(stage.name().to_string());
            if self.fail {
                return Err(ProvisionError::apply(
                    "extraction blew up",
                    anyhow::anyhow!("simulated"),
                ));
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct RecordingDestroy {
        ran: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DestroyHook for RecordingDestroy {
        async fn destroy(
            &self,
            stage: &StageSpec,
            _ctx: &HookContext,
            _var_files: &[PathBuf],
        ) -> Result<(), ProvisionError> {
            self.ran.lock().push(stage.name().to_string());
            Ok(())
        }
    }

    fn sequencer(
        stages: Vec<StageSpec>,
        dir: &Path,
        executor: Arc<MockExecutor>,
    ) -> StageSequencer {
        StageSequencer::new(
            stages,
            dir,
            dir,
            executor,
            Arc::new(MockAssetStore::new()),
        )
        .unwrap()
    }

    fn gcp_stage(name: &str) -> StageSpec {
        StageSpec::new(Platform::Gcp, name, vec![Provider::Google])
    }

    #[test]
    fn test_duplicate_stage_name_rejected() {
        let err = StageSequencer::new(
            vec![gcp_stage("cluster"), gcp_stage("cluster")],
            "/state",
            "/tool",
            Arc::new(MockExecutor::new()),
            Arc::new(MockAssetStore::new()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate stage name gcp/cluster"));
    }

    #[test]
    fn test_empty_stage_list_rejected() {
        let err = StageSequencer::new(
            Vec::new(),
            "/state",
            "/tool",
            Arc::new(MockExecutor::new()),
            Arc::new(MockAssetStore::new()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_same_name_on_different_platforms_allowed() {
        let stages = vec![
            gcp_stage("cluster"),
            StageSpec::new(Platform::Aws, "cluster", vec![Provider::Aws]),
        ];
        assert!(StageSequencer::new(
            stages,
            "/state",
            "/tool",
            Arc::new(MockExecutor::new()),
            Arc::new(MockAssetStore::new()),
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_stages_applied_in_list_order() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let seq = sequencer(
            vec![gcp_stage("cluster"), gcp_stage("bootstrap"), gcp_stage("post-bootstrap")],
            dir.path(),
            executor.clone(),
        );

        seq.provision().await.unwrap();

        assert_eq!(
            executor.stages_called(CallVerb::Apply),
            vec!["cluster", "bootstrap", "post-bootstrap"]
        );
    }

    #[tokio::test]
    async fn test_later_stage_receives_earlier_outputs_as_var_files() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let seq = sequencer(
            vec![gcp_stage("cluster"), gcp_stage("bootstrap")],
            dir.path(),
            executor.clone(),
        );

        seq.provision().await.unwrap();

        let calls = executor.calls();
        let cluster_outputs =
            ApplyOption::VarFile(dir.path().join("outputs-gcp-cluster.json"));
        assert!(!calls[0].opts.contains(&cluster_outputs));
        assert!(calls[1].opts.contains(&cluster_outputs));
    }

    #[tokio::test]
    async fn test_hook_failure_stops_pipeline_before_next_apply() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let failing = Arc::new(RecordingExtract {
            ran: Mutex::new(Vec::new()),
            fail: true,
        });
        let stages = vec![
            gcp_stage("cluster").with_extract_hook(failing),
            gcp_stage("bootstrap"),
        ];
        let seq = sequencer(stages, dir.path(), executor.clone());

        let err = seq.provision().await.unwrap_err();

        assert!(err.to_string().contains("output extraction"));
        assert_eq!(executor.stages_called(CallVerb::Apply), vec!["cluster"]);
    }

    #[tokio::test]
    async fn test_apply_failure_aborts_with_stage_context() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::new());
        executor.fail_apply_on("bootstrap", "quota exceeded");
        let failing_hook = Arc::new(RecordingExtract::default());
        let stages = vec![
            gcp_stage("cluster"),
            gcp_stage("bootstrap"),
            gcp_stage("post-bootstrap").with_extract_hook(failing_hook.clone()),
        ];
        let seq = sequencer(stages, dir.path(), executor.clone());

        let err = seq.provision().await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("stage gcp/bootstrap failed during apply"));
        assert!(msg.contains("quota exceeded"));
        // The third stage never ran, neither apply nor hook.
        assert_eq!(
            executor.stages_called(CallVerb::Apply),
            vec!["cluster", "bootstrap"]
        );
        assert!(failing_hook.ran.lock().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_runs_after_each_apply() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let hook = Arc::new(RecordingExtract::default());
        let stages = vec![
            gcp_stage("cluster").with_extract_hook(hook.clone()),
            gcp_stage("bootstrap").with_extract_hook(hook.clone()),
        ];
        let seq = sequencer(stages, dir.path(), executor);

        seq.provision().await.unwrap();

        assert_eq!(*hook.ran.lock(), vec!["cluster", "bootstrap"]);
    }

    #[tokio::test]
    async fn test_destroy_bootstrap_walks_flagged_stages_in_reverse() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let hook = Arc::new(RecordingDestroy::default());
        let stages = vec![
            gcp_stage("cluster"),
            gcp_stage("bootstrap").with_custom_bootstrap_destroy(hook.clone()),
            gcp_stage("post-bootstrap").with_custom_bootstrap_destroy(hook.clone()),
        ];
        let seq = sequencer(stages, dir.path(), executor);

        seq.destroy_bootstrap().await.unwrap();

        // The cluster stage is not flagged, so only two teardowns run.
        assert_eq!(*hook.ran.lock(), vec!["post-bootstrap", "bootstrap"]);
    }

    #[tokio::test]
    async fn test_destroy_bootstrap_default_hook_calls_executor_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let stages = vec![
            gcp_stage("cluster"),
            gcp_stage("bootstrap").with_normal_bootstrap_destroy(),
        ];
        let seq = sequencer(stages, dir.path(), executor.clone());

        seq.provision().await.unwrap();
        seq.destroy_bootstrap().await.unwrap();

        assert_eq!(executor.stages_called(CallVerb::Destroy), vec!["bootstrap"]);
        // The teardown saw the base vars plus both stages' outputs files.
        let destroy_call = executor
            .calls()
            .into_iter()
            .find(|call| call.verb == CallVerb::Destroy)
            .unwrap();
        assert_eq!(destroy_call.opts.len(), 3);
    }

    #[tokio::test]
    async fn test_destroy_hook_failure_aborts_walk() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::new());
        executor.fail_destroy_on("post-bootstrap", "drain failed");
        let later = Arc::new(RecordingDestroy::default());
        let stages = vec![
            gcp_stage("bootstrap").with_custom_bootstrap_destroy(later.clone()),
            gcp_stage("post-bootstrap").with_normal_bootstrap_destroy(),
        ];
        let seq = sequencer(stages, dir.path(), executor);

        let err = seq.destroy_bootstrap().await.unwrap_err();

        assert!(err.to_string().contains("teardown"));
        assert!(later.ran.lock().is_empty());
    }
}
