//! Test utilities: recording mocks for the external collaborators.

mod mocks;

pub use mocks::{CallVerb, ExecutorCall, MockAssetStore, MockExecutor};
