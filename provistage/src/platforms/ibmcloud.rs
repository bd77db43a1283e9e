//! IBM Cloud stage table.

use crate::platform::{Platform, Provider};
use crate::stage::StageSpec;

/// Returns the stages to run to provision the infrastructure in IBM Cloud.
#[must_use]
pub fn platform_stages() -> Vec<StageSpec> {
    vec![
        StageSpec::new(Platform::IbmCloud, "cluster", vec![Provider::IbmCloud]),
        StageSpec::new(
            Platform::IbmCloud,
            "bootstrap",
            vec![Provider::IbmCloud, Provider::Ignition],
        )
        .with_normal_bootstrap_destroy(),
    ]
}
