//! Execution context threaded through the orchestrator and controllers

use crate::report::Ledger;
use crate::telemetry::{NoopTelemetry, TelemetryEvent, TelemetrySink};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Everything one unit of work needs besides its controller
///
/// Cheap to clone: the ledger, telemetry sink and cancellation token are shared.
#[derive(Clone)]
pub struct ExecutionContext {
    region: String,
    ledger: Arc<Ledger>,
    telemetry: Arc<dyn TelemetrySink>,
    cancel: CancellationToken,
    span: Span,
}

impl ExecutionContext {
    pub fn new(
        region: impl Into<String>,
        ledger: Arc<Ledger>,
        telemetry: Arc<dyn TelemetrySink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            region: region.into(),
            ledger,
            telemetry,
            cancel,
            span: Span::current(),
        }
    }

    /// Context with a fresh ledger, no telemetry and its own cancellation token
    pub fn standalone(region: impl Into<String>) -> Self {
        Self::new(
            region,
            Arc::new(Ledger::new()),
            Arc::new(NoopTelemetry),
            CancellationToken::new(),
        )
    }

    /// Copy of this context scoped to one resource kind
    pub fn for_unit(&self, region: &str, resource_type: &str) -> Self {
        let span = tracing::info_span!(
            parent: &self.span,
            "unit",
            resource_type = %resource_type,
            region = %region
        );
        Self {
            region: region.to_string(),
            ledger: Arc::clone(&self.ledger),
            telemetry: Arc::clone(&self.telemetry),
            cancel: self.cancel.clone(),
            span,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn emit(&self, event: TelemetryEvent) {
        self.telemetry.emit(event);
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("region", &self.region)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
