//! Per-platform stage tables and hook strategies.

pub mod aws;
pub mod gcp;
pub mod ibmcloud;
