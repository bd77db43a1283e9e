//! External executor collaborator.
//!
//! The executor wraps invocation of the external infrastructure-apply tool.
//! From the sequencer's point of view every invocation is a blocking,
//! synchronous step; retries and deadlines, if any, live inside an
//! implementation, never in the core.

use crate::stage::StageSpec;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// A variable option passed to an apply or destroy invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOption {
    /// A JSON variable file consumed by the tool.
    VarFile(PathBuf),
    /// A single `key=value` variable override.
    Var(String),
}

/// Trait for external apply/destroy execution.
///
/// Implementations receive the full stage descriptor so they can resolve
/// the provider backends the stage requires.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Applies the stage's resources.
    ///
    /// On success the stage's outputs file must exist under `state_dir`
    /// (see [`StageSpec::outputs_filename`]) as a flat JSON object of
    /// output values.
    async fn apply(
        &self,
        state_dir: &Path,
        stage: &StageSpec,
        tool_dir: &Path,
        opts: &[ApplyOption],
    ) -> anyhow::Result<()>;

    /// Destroys the stage's resources.
    async fn destroy(
        &self,
        state_dir: &Path,
        stage: &StageSpec,
        tool_dir: &Path,
        opts: &[ApplyOption],
    ) -> anyhow::Result<()>;
}

/// Flattens the tool's `output -json` document to plain values.
///
/// The tool wraps every output in `{"sensitive": ..., "type": ...,
/// "value": ...}`; extraction hooks look up plain values by key, so each
/// entry is reduced to its `value` field. Entries that are already plain
/// pass through unchanged.
pub fn flatten_outputs(raw: &[u8]) -> anyhow::Result<Vec<u8>> {
    let parsed: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(raw).context("parsing tool output JSON")?;
    let mut flat = serde_json::Map::with_capacity(parsed.len());
    for (key, entry) in parsed {
        let value = match entry {
            serde_json::Value::Object(mut wrapper) => match wrapper.remove("value") {
                Some(value) => value,
                None => serde_json::Value::Object(wrapper),
            },
            other => other,
        };
        flat.insert(key, value);
    }
    Ok(serde_json::to_vec(&flat)?)
}

/// An executor shelling out to a terraform-style CLI binary.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    binary: PathBuf,
}

impl CommandExecutor {
    /// Creates an executor invoking `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn base_command(
        &self,
        verb: &str,
        state_dir: &Path,
        stage: &StageSpec,
        tool_dir: &Path,
        opts: &[ApplyOption],
    ) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(tool_dir)
            .arg(verb)
            .arg("-auto-approve")
            .arg("-no-color")
            .arg("-input=false")
            .arg(format!(
                "-state={}",
                state_dir.join(stage.state_filename()).display()
            ));
        for opt in opts {
            match opt {
                ApplyOption::VarFile(path) => {
                    cmd.arg(format!("-var-file={}", path.display()));
                }
                ApplyOption::Var(kv) => {
                    cmd.arg(format!("-var={kv}"));
                }
            }
        }
        cmd
    }

    async fn run(&self, mut cmd: Command, what: &str) -> anyhow::Result<Vec<u8>> {
        debug!(command = ?cmd, "invoking external tool");
        let output = cmd
            .output()
            .await
            .with_context(|| format!("launching {} for {what}", self.binary.display()))?;
        if !output.status.success() {
            bail!(
                "{what} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn apply(
        &self,
        state_dir: &Path,
        stage: &StageSpec,
        tool_dir: &Path,
        opts: &[ApplyOption],
    ) -> anyhow::Result<()> {
        debug!(
            platform = %stage.platform(),
            stage = stage.name(),
            providers = ?stage.providers(),
            "resolving provider backends"
        );
        let cmd = self.base_command("apply", state_dir, stage, tool_dir, opts);
        self.run(cmd, &format!("apply of {}/{}", stage.platform(), stage.name()))
            .await?;

        // Capture the stage outputs for consumption by later stages.
        let mut outputs_cmd = Command::new(&self.binary);
        outputs_cmd
            .current_dir(tool_dir)
            .arg("output")
            .arg("-json")
            .arg("-no-color")
            .arg(format!(
                "-state={}",
                state_dir.join(stage.state_filename()).display()
            ));
        let raw = self
            .run(
                outputs_cmd,
                &format!("output capture of {}/{}", stage.platform(), stage.name()),
            )
            .await?;
        let flat = flatten_outputs(&raw)?;
        let outputs_path = state_dir.join(stage.outputs_filename());
        tokio::fs::write(&outputs_path, &flat)
            .await
            .with_context(|| format!("writing {}", outputs_path.display()))?;
        Ok(())
    }

    async fn destroy(
        &self,
        state_dir: &Path,
        stage: &StageSpec,
        tool_dir: &Path,
        opts: &[ApplyOption],
    ) -> anyhow::Result<()> {
        let cmd = self.base_command("destroy", state_dir, stage, tool_dir, opts);
        self.run(cmd, &format!("destroy of {}/{}", stage.platform(), stage.name()))
            .await?;
        Ok(())
    }
}
