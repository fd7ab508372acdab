//! Concurrent execution of (kind, region) units of work

use crate::context::ExecutionContext;
use crate::controller::ResourceController;
use crate::filter::Config;
use crate::orchestrator::{self, UnitReport};
use crate::report::{Ledger, OutcomeEntry, RunSummary};
use crate::telemetry::TelemetrySink;
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One resource kind to sweep in one region
#[derive(Clone)]
pub struct WorkUnit {
    pub region: String,
    pub controller: Arc<dyn ResourceController>,
}

impl WorkUnit {
    pub fn new(region: impl Into<String>, controller: Arc<dyn ResourceController>) -> Self {
        Self {
            region: region.into(),
            controller,
        }
    }

    pub fn resource_type(&self) -> &str {
        self.controller.resource_name()
    }
}

impl std::fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkUnit")
            .field("region", &self.region)
            .field("resource_type", &self.resource_type())
            .finish()
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    /// Units processed at the same time
    pub max_concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
    pub entries: Vec<OutcomeEntry>,
    pub summary: RunSummary,
    pub cancelled: bool,
}

impl RunReport {
    /// `true` when no unit reported a discovery or deletion error
    pub fn is_success(&self) -> bool {
        self.units.iter().all(|u| u.is_success())
    }

    pub fn failed_units(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| !u.is_success())
    }

    /// Units the cancellation reached before they discovered anything
    pub fn not_started_units(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| !u.started)
    }

    /// Identifiers discovered but never attempted
    pub fn skipped(&self) -> usize {
        self.units.iter().map(|u| u.skipped).sum()
    }
}

/// Identifiers found by a dry run, grouped by unit
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// (region, resource_type) -> identifiers in discovery order
    pub found: BTreeMap<(String, String), Vec<String>>,
    /// Units whose discovery failed
    pub errors: Vec<(String, String, crate::error::SweepError)>,
}

impl Inventory {
    pub fn total(&self) -> usize {
        self.found.values().map(|ids| ids.len()).sum()
    }
}

/// Drives units of work through the orchestrator with bounded concurrency
pub struct Runner {
    config: Arc<Config>,
    telemetry: Arc<dyn TelemetrySink>,
    cancel: CancellationToken,
    settings: RunnerConfig,
}

impl Runner {
    pub fn new(
        config: Arc<Config>,
        telemetry: Arc<dyn TelemetrySink>,
        cancel: CancellationToken,
        settings: RunnerConfig,
    ) -> Self {
        Self {
            config,
            telemetry,
            cancel,
            settings,
        }
    }

    fn context(&self, ledger: Arc<Ledger>) -> ExecutionContext {
        ExecutionContext::new("", ledger, Arc::clone(&self.telemetry), self.cancel.clone())
    }

    /// Delete everything the filters select, one orchestrator run per unit
    ///
    /// Units are started in the given order; at most `max_concurrency` run at once.
    pub async fn run(&self, units: Vec<WorkUnit>) -> RunReport {
        let ledger = Arc::new(Ledger::new());
        let root = self.context(Arc::clone(&ledger));
        let config = &self.config;

        tracing::info!(
            units = units.len(),
            max_concurrency = self.settings.max_concurrency,
            "Starting sweep"
        );

        let reports: Vec<UnitReport> = stream::iter(units)
            .map(|unit| {
                let ctx = root.for_unit(&unit.region, unit.resource_type());
                async move {
                    if ctx.is_cancelled() {
                        tracing::warn!(
                            region = %unit.region,
                            resource_type = unit.resource_type(),
                            "Run cancelled before unit started"
                        );
                        let mut report = UnitReport::new(unit.resource_type(), &unit.region);
                        report.cancelled = true;
                        return report;
                    }
                    orchestrator::run(unit.controller.as_ref(), config, &ctx).await
                }
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        RunReport {
            units: reports,
            entries: ledger.entries(),
            summary: ledger.summary(),
            cancelled: self.cancel.is_cancelled(),
        }
    }

    /// Discover and filter only; nothing is deleted
    pub async fn inspect(&self, units: Vec<WorkUnit>) -> Inventory {
        let root = self.context(Arc::new(Ledger::new()));
        let config = &self.config;

        let results: Vec<_> = stream::iter(units)
            .map(|unit| {
                let ctx = root.for_unit(&unit.region, unit.resource_type());
                async move {
                    let result =
                        orchestrator::inspect(unit.controller.as_ref(), config, &ctx).await;
                    (unit.region.clone(), unit.resource_type().to_string(), result)
                }
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        let mut inventory = Inventory::default();
        for (region, resource_type, result) in results {
            match result {
                Ok(ids) => {
                    inventory.found.insert((region, resource_type), ids);
                }
                Err(e) => inventory.errors.push((region, resource_type, e)),
            }
        }
        inventory
    }
}
