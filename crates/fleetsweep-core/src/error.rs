//! Sweep error types

use std::sync::Arc;
use thiserror::Error;

/// Shared, cloneable underlying cause of a sweep error
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while discovering or deleting resources
#[derive(Error, Debug, Clone)]
pub enum SweepError {
    #[error("Failed to discover {resource_type} in {region}: {source}")]
    Discovery {
        resource_type: String,
        region: String,
        #[source]
        source: Cause,
    },

    #[error("Failed to delete {resource_type} '{identifier}': {source}")]
    PerItemDelete {
        resource_type: String,
        identifier: String,
        #[source]
        source: Cause,
    },

    #[error("Delete call for a batch of {batch_size} {resource_type} in {region} failed: {source}")]
    BatchTransport {
        resource_type: String,
        region: String,
        batch_size: usize,
        #[source]
        source: Cause,
    },

    #[error("Timed out waiting for {resource_type} '{identifier}' to be deleted ({attempts} checks)")]
    DeletionTimeout {
        resource_type: String,
        identifier: String,
        attempts: u32,
    },

    #[error("Failed to confirm deletion of {resource_type} '{identifier}': {source}")]
    Probe {
        resource_type: String,
        identifier: String,
        #[source]
        source: Cause,
    },

    #[error("Cancelled before {resource_type} '{identifier}' was confirmed deleted")]
    Cancelled {
        resource_type: String,
        identifier: String,
    },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl SweepError {
    pub fn discovery(
        resource_type: impl Into<String>,
        region: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Discovery {
            resource_type: resource_type.into(),
            region: region.into(),
            source: Arc::new(source),
        }
    }

    pub fn per_item(
        resource_type: impl Into<String>,
        identifier: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::PerItemDelete {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            source: Arc::new(source),
        }
    }

    pub fn batch_transport(
        resource_type: impl Into<String>,
        region: impl Into<String>,
        batch_size: usize,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::BatchTransport {
            resource_type: resource_type.into(),
            region: region.into(),
            batch_size,
            source: Arc::new(source),
        }
    }

    pub fn probe(
        resource_type: impl Into<String>,
        identifier: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Probe {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            source: Arc::new(source),
        }
    }

    /// Identifier the error is about, if it concerns a single resource
    pub fn identifier(&self) -> Option<&str> {
        match self {
            SweepError::PerItemDelete { identifier, .. }
            | SweepError::DeletionTimeout { identifier, .. }
            | SweepError::Probe { identifier, .. }
            | SweepError::Cancelled { identifier, .. } => Some(identifier),
            _ => None,
        }
    }

    /// Short machine-friendly name of the error kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            SweepError::Discovery { .. } => "discovery",
            SweepError::PerItemDelete { .. } => "delete",
            SweepError::BatchTransport { .. } => "batch-transport",
            SweepError::DeletionTimeout { .. } => "timeout",
            SweepError::Probe { .. } => "probe",
            SweepError::Cancelled { .. } => "cancelled",
            SweepError::Aggregate(_) => "aggregate",
        }
    }
}

/// All individual failures collected during one orchestrator run
#[derive(Error, Debug, Clone, Default)]
#[error("{} resource(s) failed to delete", .errors.len())]
pub struct AggregateError {
    pub errors: Vec<SweepError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: SweepError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `None` when nothing failed
    pub fn into_result(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
