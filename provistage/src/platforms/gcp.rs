//! GCP stage table and hook strategies.
//!
//! The cluster stage's apply produces the API load-balancer addresses; its
//! extraction hook propagates them into the bootstrap ignition asset so the
//! bootstrap stage's apply embeds the correct addresses. During teardown,
//! the bootstrap node must be drained from load-balancer backends before
//! its compute is deleted, so the post-bootstrap stage replaces the default
//! full destroy with a targeted partial apply.

use crate::asset::AssetRef;
use crate::errors::ProvisionError;
use crate::executor::ApplyOption;
use crate::hooks::{DestroyHook, ExtractHook, HookContext};
use crate::lbconfig::LbConfig;
use crate::outputs::StageOutputs;
use crate::platform::{Platform, Provider};
use crate::stage::StageSpec;
use crate::vars::VariableFile;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Output key carrying the external API load-balancer address.
const EXTERNAL_IP_KEY: &str = "cluster_public_ip";

/// Output key carrying the internal API load-balancer address.
const INTERNAL_IP_KEY: &str = "cluster_ip";

/// Variable key carrying the bootstrap ignition payload.
const IGNITION_BOOTSTRAP_KEY: &str = "ignition_bootstrap";

/// Returns the stages to run to provision the infrastructure in GCP.
#[must_use]
pub fn platform_stages() -> Vec<StageSpec> {
    vec![
        StageSpec::new(Platform::Gcp, "cluster", vec![Provider::Google])
            .with_extract_hook(Arc::new(GcpLbConfigExtract)),
        StageSpec::new(
            Platform::Gcp,
            "bootstrap",
            vec![Provider::Google, Provider::Ignition],
        )
        .with_normal_bootstrap_destroy(),
        StageSpec::new(Platform::Gcp, "post-bootstrap", vec![Provider::Google])
            .with_custom_bootstrap_destroy(Arc::new(GcpLbDetach)),
    ]
}

/// Extraction hook for the GCP cluster stage.
///
/// Pulls the load-balancer addresses out of the stage outputs, writes the
/// load-balancer config document, regenerates the bootstrap ignition asset
/// from it, and rewrites the ignition variable consumed by the bootstrap
/// stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcpLbConfigExtract;

#[async_trait]
impl ExtractHook for GcpLbConfigExtract {
    async fn extract(
        &self,
        stage: &StageSpec,
        ctx: &HookContext,
        outputs_path: &Path,
        vars_path: &Path,
    ) -> Result<(), ProvisionError> {
        let outputs = StageOutputs::load(stage.name(), outputs_path).await?;
        // Both keys must exist before any destructive mutation happens.
        let external_ip = outputs.require_str(EXTERNAL_IP_KEY)?.to_string();
        let internal_ip = outputs.require_str(INTERNAL_IP_KEY)?.to_string();

        let config = LbConfig::for_dns(&internal_ip, &external_ip, stage.platform());
        let written = config.write_to(&ctx.state_dir).await?;
        debug!(path = %written.display(), "wrote load balancer config");

        // Invalidate the cached bootstrap ignition so the next fetch
        // regenerates it against the config written above.
        let bootstrap = AssetRef::bootstrap_ignition();
        ctx.asset_store
            .destroy(&bootstrap)
            .await
            .map_err(|source| ProvisionError::asset_destroy(bootstrap.name(), source))?;
        let ignition = ctx
            .asset_store
            .fetch(&bootstrap)
            .await
            .map_err(|source| ProvisionError::asset_fetch(bootstrap.name(), source))?;
        // The variable must equal the fetched content exactly; no lossy
        // substitution of invalid bytes.
        let ignition = String::from_utf8(ignition)
            .map_err(|source| ProvisionError::asset_encoding(bootstrap.name(), source))?;

        let mut vars = VariableFile::load(vars_path).await?;
        vars.set(IGNITION_BOOTSTRAP_KEY, Value::String(ignition));
        vars.persist().await?;
        Ok(())
    }
}

/// Teardown hook for the GCP post-bootstrap stage.
///
/// Disables load-balancer membership for the bootstrap node with a partial
/// apply that flips a single flag, instead of destroying resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcpLbDetach;

#[async_trait]
impl DestroyHook for GcpLbDetach {
    async fn destroy(
        &self,
        stage: &StageSpec,
        ctx: &HookContext,
        var_files: &[std::path::PathBuf],
    ) -> Result<(), ProvisionError> {
        let mut opts: Vec<ApplyOption> = var_files
            .iter()
            .cloned()
            .map(ApplyOption::VarFile)
            .collect();
        opts.push(ApplyOption::Var("gcp_bootstrap_lb=false".to_string()));
        ctx.executor
            .apply(&ctx.state_dir, stage, &ctx.tool_dir, &opts)
            .await
            .map_err(|source| {
                ProvisionError::apply("failed disabling bootstrap load balancing", source)
            })
    }
}
