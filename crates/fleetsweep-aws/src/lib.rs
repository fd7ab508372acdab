//! AWS provider for FleetSweep
//!
//! Supplies one [`fleetsweep_core::ResourceController`] per supported AWS
//! resource kind. Use [`registry`] to get every controller for a region.

pub mod context;
pub mod error;
pub mod resources;

pub use context::{AwsContext, DEFAULT_REGION};
pub use error::{AwsError, classify_aws_error, from_sdk};
pub use resources::{
    AwsController, KindSpec, RESOURCE_NAMES, ResourceApi, ResourceRecord, registry,
};
