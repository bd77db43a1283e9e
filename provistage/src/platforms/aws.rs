//! AWS stage table.
//!
//! AWS needs no custom extraction: the bootstrap ignition is complete
//! before the cluster stage applies, so both stages run with the default
//! hooks.

use crate::platform::{Platform, Provider};
use crate::stage::StageSpec;

/// Returns the stages to run to provision the infrastructure in AWS.
#[must_use]
pub fn platform_stages() -> Vec<StageSpec> {
    vec![
        StageSpec::new(Platform::Aws, "cluster", vec![Provider::Aws]),
        StageSpec::new(
            Platform::Aws,
            "bootstrap",
            vec![Provider::Aws, Provider::Ignition],
        )
        .with_normal_bootstrap_destroy(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_table() {
        let stages = platform_stages();
        assert_eq!(stages.len(), 2);
        assert!(stages.iter().all(|s| s.platform() == Platform::Aws));
        assert!(stages[1].destroy_with_bootstrap());
    }
}
