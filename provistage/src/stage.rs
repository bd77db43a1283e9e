//! Stage descriptors.
//!
//! A stage is one ordered step of infrastructure provisioning tied to a
//! named set of provider backends. Descriptors are constructed once per
//! platform at startup and are immutable afterwards.

use crate::hooks::{DestroyHook, ExtractHook, FullDestroy, NoOpExtract};
use crate::platform::{Platform, Provider};
use std::sync::Arc;

/// Returns the filename the stage's apply outputs are captured under.
#[must_use]
pub fn outputs_filename(platform: Platform, stage: &str) -> String {
    format!("outputs-{platform}-{stage}.json")
}

/// Returns the filename the stage's tool state is kept under.
#[must_use]
pub fn state_filename(platform: Platform, stage: &str) -> String {
    format!("state-{platform}-{stage}.tfstate")
}

/// Declarative definition of one provisioning stage.
#[derive(Debug, Clone)]
pub struct StageSpec {
    platform: Platform,
    name: String,
    providers: Vec<Provider>,
    extract_hook: Arc<dyn ExtractHook>,
    destroy_hook: Arc<dyn DestroyHook>,
    destroy_with_bootstrap: bool,
}

impl StageSpec {
    /// Creates a stage with default hooks: no-op extraction and a full
    /// destroy of the stage's resources.
    #[must_use]
    pub fn new(
        platform: Platform,
        name: impl Into<String>,
        providers: Vec<Provider>,
    ) -> Self {
        Self {
            platform,
            name: name.into(),
            providers,
            extract_hook: Arc::new(NoOpExtract),
            destroy_hook: Arc::new(FullDestroy),
            destroy_with_bootstrap: false,
        }
    }

    /// Sets a custom output-extraction hook.
    #[must_use]
    pub fn with_extract_hook(mut self, hook: Arc<dyn ExtractHook>) -> Self {
        self.extract_hook = hook;
        self
    }

    /// Marks the stage for teardown during bootstrap destroy, using the
    /// default full-destroy behavior.
    #[must_use]
    pub fn with_normal_bootstrap_destroy(mut self) -> Self {
        self.destroy_with_bootstrap = true;
        self.destroy_hook = Arc::new(FullDestroy);
        self
    }

    /// Marks the stage for teardown during bootstrap destroy with a custom
    /// destroy hook (e.g. a partial apply that drains load balancers).
    #[must_use]
    pub fn with_custom_bootstrap_destroy(mut self, hook: Arc<dyn DestroyHook>) -> Self {
        self.destroy_with_bootstrap = true;
        self.destroy_hook = hook;
        self
    }

    /// Returns the platform the stage targets.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Returns the stage name, unique within a platform.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the provider backends required to apply this stage.
    #[must_use]
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Returns whether the stage participates in bootstrap teardown.
    #[must_use]
    pub fn destroy_with_bootstrap(&self) -> bool {
        self.destroy_with_bootstrap
    }

    /// Returns the stage's output-extraction hook.
    #[must_use]
    pub fn extract_hook(&self) -> &Arc<dyn ExtractHook> {
        &self.extract_hook
    }

    /// Returns the stage's teardown hook.
    #[must_use]
    pub fn destroy_hook(&self) -> &Arc<dyn DestroyHook> {
        &self.destroy_hook
    }

    /// Returns the filename this stage's outputs are captured under.
    #[must_use]
    pub fn outputs_filename(&self) -> String {
        outputs_filename(self.platform, &self.name)
    }

    /// Returns the filename this stage's tool state is kept under.
    #[must_use]
    pub fn state_filename(&self) -> String {
        state_filename(self.platform, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let stage = StageSpec::new(Platform::Gcp, "cluster", vec![Provider::Google]);
        assert_eq!(stage.platform(), Platform::Gcp);
        assert_eq!(stage.name(), "cluster");
        assert_eq!(stage.providers(), &[Provider::Google]);
        assert!(!stage.destroy_with_bootstrap());
    }

    #[test]
    fn test_bootstrap_destroy_options_set_flag() {
        let normal = StageSpec::new(Platform::Gcp, "bootstrap", vec![Provider::Google])
            .with_normal_bootstrap_destroy();
        assert!(normal.destroy_with_bootstrap());

        let custom = StageSpec::new(Platform::Gcp, "post-bootstrap", vec![Provider::Google])
            .with_custom_bootstrap_destroy(Arc::new(FullDestroy));
        assert!(custom.destroy_with_bootstrap());
    }

    #[test]
    fn test_derived_filenames() {
        let stage = StageSpec::new(Platform::Gcp, "cluster", vec![Provider::Google]);
        assert_eq!(stage.outputs_filename(), "outputs-gcp-cluster.json");
        assert_eq!(stage.state_filename(), "state-gcp-cluster.tfstate");
    }
}
