//! Resource controller trait definition

use crate::context::ExecutionContext;
use crate::error::{Result, SweepError};
use crate::filter::Config;
use async_trait::async_trait;
use std::time::Duration;

/// Per-kind capability used by the orchestrator
///
/// Every supported resource kind implements this trait once. Implementations
/// are flat structs holding only the client handle they talk through.
#[async_trait]
pub trait ResourceController: Send + Sync {
    /// Kind name, used as the config key and report label (e.g., "ecr")
    fn resource_name(&self) -> &str;

    /// Ceiling on identifiers per `delete` call
    fn max_batch_size(&self) -> usize;

    /// List the kind's resources in the context's region and return the
    /// identifiers that pass this kind's filter rules, in discovery order
    async fn discover(&self, ctx: &ExecutionContext, config: &Config) -> Result<Vec<String>>;

    /// Best-effort delete of every identifier in the batch
    ///
    /// Per-item failures are reported through [`ItemOutcome`]; `Err` is
    /// reserved for a failure of the call as a whole.
    async fn delete(&self, ctx: &ExecutionContext, batch: &[String]) -> Result<Vec<ItemOutcome>>;

    /// Wait policy for kinds whose delete is accepted before the resource is gone
    fn completion(&self) -> Option<WaitPolicy> {
        None
    }

    /// Check whether an accepted deletion has completed
    async fn probe(&self, _ctx: &ExecutionContext, _identifier: &str) -> Result<ProbeStatus> {
        Ok(ProbeStatus::Gone)
    }
}

/// Result of deleting one identifier
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub identifier: String,
    pub error: Option<SweepError>,
}

impl ItemOutcome {
    pub fn accepted(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            error: None,
        }
    }

    pub fn failed(identifier: impl Into<String>, error: SweepError) -> Self {
        Self {
            identifier: identifier.into(),
            error: Some(error),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.error.is_none()
    }
}

/// What a completion probe observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Gone,
    StillPresent,
}

/// Bounded polling schedule for asynchronous deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between probes
    pub interval: Duration,
    /// Maximum number of probe calls
    pub max_attempts: u32,
}

impl WaitPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent waiting for one resource
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), 60)
    }
}
