//! Batch orchestration for one resource kind in one region
//!
//! Discovery, batching, deletion and completion waiting happen strictly in
//! that order. A failure of one identifier never stops the others.

use crate::context::ExecutionContext;
use crate::controller::{ItemOutcome, ResourceController};
use crate::error::{AggregateError, Result, SweepError};
use crate::filter::Config;
use crate::report::OutcomeEntry;
use crate::telemetry::TelemetryEvent;
use crate::waiter::wait_until_gone;
use tracing::{Instrument, debug, error, info, warn};

/// Result of one (kind, region) unit of work
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub resource_type: String,
    pub region: String,
    /// `false` when the run was cancelled before this unit began discovery
    pub started: bool,
    pub discovered: usize,
    pub batches_started: usize,
    pub batches_total: usize,
    /// Identifiers never attempted because the run was cancelled
    pub skipped: usize,
    pub cancelled: bool,
    pub error: Option<SweepError>,
}

impl UnitReport {
    pub(crate) fn new(resource_type: &str, region: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            region: region.to_string(),
            started: false,
            discovered: 0,
            batches_started: 0,
            batches_total: 0,
            skipped: 0,
            cancelled: false,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Split identifiers into consecutive batches of at most `max` items
///
/// A `max` of zero is treated as one.
pub fn partition(ids: &[String], max: usize) -> Vec<&[String]> {
    ids.chunks(max.max(1)).collect()
}

/// Discover and filter only, without deleting anything
pub async fn inspect(
    controller: &dyn ResourceController,
    config: &Config,
    ctx: &ExecutionContext,
) -> Result<Vec<String>> {
    controller
        .discover(ctx, config)
        .instrument(ctx.span().clone())
        .await
}

/// Delete every resource of the controller's kind that passes the filter
///
/// The returned report carries a `Discovery` error when listing failed and
/// an `Aggregate` error when at least one identifier failed.
pub async fn run(
    controller: &dyn ResourceController,
    config: &Config,
    ctx: &ExecutionContext,
) -> UnitReport {
    let span = ctx.span().clone();
    run_inner(controller, config, ctx).instrument(span).await
}

async fn run_inner(
    controller: &dyn ResourceController,
    config: &Config,
    ctx: &ExecutionContext,
) -> UnitReport {
    let resource_type = controller.resource_name();
    let region = ctx.region();
    let mut report = UnitReport::new(resource_type, region);
    report.started = true;

    let ids = match controller.discover(ctx, config).await {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "Discovery failed");
            report.error = Some(e);
            return report;
        }
    };
    report.discovered = ids.len();

    if ids.is_empty() {
        debug!("No {} to delete in {}", resource_type, region);
        return report;
    }

    info!("Deleting {} {} in {}", ids.len(), resource_type, region);

    let batches = partition(&ids, controller.max_batch_size());
    report.batches_total = batches.len();
    let mut failures = AggregateError::new();
    let mut deleted = 0usize;

    for (index, batch) in batches.iter().enumerate() {
        if ctx.is_cancelled() {
            report.skipped = batches[index..].iter().map(|b| b.len()).sum();
            report.cancelled = true;
            warn!(
                skipped = report.skipped,
                "Run cancelled, not starting remaining batches"
            );
            break;
        }
        report.batches_started += 1;

        let outcomes = match controller.delete(ctx, batch).await {
            Ok(outcomes) => reconcile(resource_type, batch, outcomes),
            Err(e) => {
                error!(batch = index, error = %e, "Batch delete failed");
                batch
                    .iter()
                    .map(|id| ItemOutcome::failed(id.clone(), e.clone()))
                    .collect()
            }
        };

        for outcome in outcomes {
            let result = match outcome.error {
                Some(e) => Err(e),
                None => confirm(controller, ctx, &outcome.identifier).await,
            };

            match result {
                Ok(()) => {
                    deleted += 1;
                    info!(identifier = %outcome.identifier, "Deleted");
                    ctx.ledger().record(OutcomeEntry::success(
                        &outcome.identifier,
                        resource_type,
                        region,
                    ));
                }
                Err(e) => {
                    error!(identifier = %outcome.identifier, error = %e, "[Failed]");
                    ctx.emit(TelemetryEvent::deletion_failed(
                        resource_type,
                        region,
                        &outcome.identifier,
                    ));
                    ctx.ledger().record(OutcomeEntry::failure(
                        &outcome.identifier,
                        resource_type,
                        region,
                        e.clone(),
                    ));
                    failures.push(e);
                }
            }
        }
    }

    info!(
        "[OK] {} {} deleted in {} ({} failed)",
        deleted,
        resource_type,
        region,
        failures.len()
    );

    report.error = failures.into_result().map(SweepError::Aggregate);
    report
}

/// Wait for an accepted delete to complete when the kind deletes asynchronously
async fn confirm(
    controller: &dyn ResourceController,
    ctx: &ExecutionContext,
    identifier: &str,
) -> Result<()> {
    let Some(policy) = controller.completion() else {
        return Ok(());
    };

    wait_until_gone(
        controller.resource_name(),
        identifier,
        policy,
        ctx.cancel_token(),
        || controller.probe(ctx, identifier),
    )
    .await
}

/// Line outcomes up with the batch: one per identifier, in batch order
///
/// Controllers that forget an identifier get it marked failed so nothing is
/// silently dropped; outcomes for identifiers outside the batch are ignored.
fn reconcile(resource_type: &str, batch: &[String], outcomes: Vec<ItemOutcome>) -> Vec<ItemOutcome> {
    let mut by_id: std::collections::HashMap<String, ItemOutcome> = outcomes
        .into_iter()
        .map(|o| (o.identifier.clone(), o))
        .collect();

    batch
        .iter()
        .map(|id| {
            by_id.remove(id).unwrap_or_else(|| {
                ItemOutcome::failed(
                    id.clone(),
                    SweepError::per_item(resource_type, id.clone(), MissingOutcome),
                )
            })
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
#[error("controller returned no outcome for this identifier")]
struct MissingOutcome;
