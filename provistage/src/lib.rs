//! # Provistage
//!
//! A multi-stage infrastructure provisioning pipeline.
//!
//! Provistage sequences ordered infrastructure-creation stages (cluster
//! network, bootstrap, post-bootstrap) against an external apply tool, with
//! support for:
//!
//! - **Strict stage ordering**: a later stage's apply never begins before
//!   the earlier stage's output-extraction hook has completed and its disk
//!   mutations are persisted
//! - **Output extraction**: stage-specific hooks that read a stage's
//!   structured output, derive configuration, and regenerate dependent
//!   assets (e.g. bootstrap ignition) for the next stage
//! - **Safe partial teardown**: per-stage destroy strategies, so bootstrap
//!   teardown can drain load balancers before deleting compute
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use provistage::prelude::*;
//!
//! let sequencer = StageSequencer::new(
//!     gcp::platform_stages(),
//!     state_dir,
//!     tool_dir,
//!     executor,
//!     asset_store,
//! )?;
//! sequencer.provision().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod asset;
pub mod errors;
pub mod executor;
pub mod hooks;
pub mod lbconfig;
pub mod observability;
pub mod outputs;
pub mod platform;
pub mod platforms;
pub mod sequencer;
pub mod stage;
pub mod testing;
pub mod vars;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::asset::{AssetRef, AssetStore, DiskAssetStore};
    pub use crate::errors::{
        AssetOp, ProvisionError, StageSetValidationError, StageStep,
    };
    pub use crate::executor::{ApplyOption, CommandExecutor, Executor};
    pub use crate::hooks::{
        DestroyHook, ExtractHook, FullDestroy, HookContext, NoOpExtract,
    };
    pub use crate::lbconfig::LbConfig;
    pub use crate::outputs::StageOutputs;
    pub use crate::platform::{Platform, Provider};
    pub use crate::platforms::{aws, gcp, ibmcloud};
    pub use crate::sequencer::{RunId, StageSequencer};
    pub use crate::stage::StageSpec;
    pub use crate::vars::VariableFile;
}
