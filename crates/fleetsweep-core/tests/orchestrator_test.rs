//! Orchestrator and runner behavior against fake controllers

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use fleetsweep_core::{
    Config, ExecutionContext, FilterRule, ItemOutcome, Ledger, NamePattern, NoopTelemetry,
    ProbeStatus, ResourceController, ResourceTypeConfig, ResourceValue, Runner, RunnerConfig,
    SweepError, TelemetryEvent, TelemetrySink, WaitPolicy, WorkUnit, orchestrator,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FakeError(String);

/// Controller backed by literal fixtures
#[derive(Default)]
struct FakeController {
    name: &'static str,
    max_batch: usize,
    candidates: Vec<(String, ResourceValue)>,
    failing: HashSet<String>,
    transport_failing_batches: HashSet<usize>,
    discovery_fails: bool,
    completion: Option<WaitPolicy>,
    /// Probes reporting `StillPresent` before `Gone`, per identifier
    still_present: HashMap<String, u32>,
    cancel_after_batch: Option<CancellationToken>,
    batches: Mutex<Vec<Vec<String>>>,
    probes: Mutex<HashMap<String, u32>>,
}

impl FakeController {
    fn new(name: &'static str, ids: &[&str]) -> Self {
        Self {
            name,
            max_batch: 10,
            candidates: ids
                .iter()
                .map(|id| (id.to_string(), ResourceValue::new().with_name(*id)))
                .collect(),
            ..Default::default()
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceController for FakeController {
    fn resource_name(&self) -> &str {
        self.name
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }

    async fn discover(
        &self,
        ctx: &ExecutionContext,
        config: &Config,
    ) -> fleetsweep_core::Result<Vec<String>> {
        if self.discovery_fails {
            return Err(SweepError::discovery(
                self.name,
                ctx.region(),
                FakeError("list failed".to_string()),
            ));
        }
        let rules = config.for_kind(self.name);
        Ok(self
            .candidates
            .iter()
            .filter(|(_, value)| rules.should_include(value))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn delete(
        &self,
        ctx: &ExecutionContext,
        batch: &[String],
    ) -> fleetsweep_core::Result<Vec<ItemOutcome>> {
        let index = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(batch.to_vec());
            batches.len() - 1
        };
        if let Some(token) = &self.cancel_after_batch {
            token.cancel();
        }
        if self.transport_failing_batches.contains(&index) {
            return Err(SweepError::batch_transport(
                self.name,
                ctx.region(),
                batch.len(),
                FakeError("connection reset".to_string()),
            ));
        }
        Ok(batch
            .iter()
            .map(|id| {
                if self.failing.contains(id) {
                    ItemOutcome::failed(
                        id.clone(),
                        SweepError::per_item(self.name, id.clone(), FakeError("in use".to_string())),
                    )
                } else {
                    ItemOutcome::accepted(id.clone())
                }
            })
            .collect())
    }

    fn completion(&self) -> Option<WaitPolicy> {
        self.completion
    }

    async fn probe(
        &self,
        _ctx: &ExecutionContext,
        identifier: &str,
    ) -> fleetsweep_core::Result<ProbeStatus> {
        let mut probes = self.probes.lock().unwrap();
        let seen = probes.entry(identifier.to_string()).or_insert(0);
        *seen += 1;
        let limit = self.still_present.get(identifier).copied().unwrap_or(0);
        Ok(if *seen > limit {
            ProbeStatus::Gone
        } else {
            ProbeStatus::StillPresent
        })
    }
}

/// Telemetry sink that remembers every event
#[derive(Default)]
struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn context_with(telemetry: Arc<dyn TelemetrySink>, cancel: CancellationToken) -> ExecutionContext {
    ExecutionContext::new("us-east-1", Arc::new(Ledger::new()), telemetry, cancel)
}

fn names_rule(pattern: &str) -> FilterRule {
    FilterRule {
        name_patterns: vec![NamePattern::new(pattern).unwrap()],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_no_candidates_is_silent_success() {
    let controller = FakeController::new("ecr", &[]);
    let ctx = ExecutionContext::standalone("us-east-1");

    let report = orchestrator::run(&controller, &Config::new(), &ctx).await;

    assert!(report.is_success());
    assert_eq!(report.discovered, 0);
    assert!(ctx.ledger().is_empty());
    assert!(controller.batches().is_empty());
}

#[tokio::test]
async fn test_batches_are_partitioned_in_order() {
    let mut controller = FakeController::new("ecr", &["a", "b", "c", "d", "e"]);
    controller.max_batch = 2;
    let ctx = ExecutionContext::standalone("us-east-1");

    let report = orchestrator::run(&controller, &Config::new(), &ctx).await;

    assert!(report.is_success());
    assert_eq!(
        controller.batches(),
        vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]
    );
    assert_eq!(report.batches_total, 3);
    assert_eq!(ctx.ledger().summary().succeeded, 5);
}

#[tokio::test]
async fn test_failure_is_isolated_within_batch() {
    let mut controller = FakeController::new("dynamodb", &["t1", "t2", "t3"]);
    controller.failing.insert("t2".to_string());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let ctx = context_with(telemetry.clone(), CancellationToken::new());

    let report = orchestrator::run(&controller, &Config::new(), &ctx).await;

    let entries = ctx.ledger().entries();
    assert_eq!(entries.len(), 3);
    assert!(entries[0].is_success());
    assert!(!entries[1].is_success());
    assert!(entries[2].is_success());

    match report.error {
        Some(SweepError::Aggregate(agg)) => {
            assert_eq!(agg.len(), 1);
            assert_eq!(agg.errors[0].identifier(), Some("t2"));
        }
        other => panic!("Expected aggregate error, got {:?}", other),
    }

    let events = telemetry.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "error-nuking-dynamodb");
    assert_eq!(events[0].attributes["region"], "us-east-1");
}

#[tokio::test]
async fn test_filter_is_applied_before_delete() {
    let controller = FakeController::new("ecr", &["keep-me", "drop-me"]);
    let config = Config::new().with("ecr", ResourceTypeConfig::new().exclude(names_rule("keep")));
    let ctx = ExecutionContext::standalone("us-east-1");

    orchestrator::run(&controller, &config, &ctx).await;

    assert_eq!(controller.batches(), vec![vec!["drop-me"]]);
}

#[tokio::test]
async fn test_time_after_exclusion_selects_nothing() {
    let now = Utc::now();
    let mut controller = FakeController::new("codedeploy-application", &[]);
    controller.candidates = vec![
        (
            "cloud-nuke-test-1".to_string(),
            ResourceValue::new()
                .with_name("cloud-nuke-test-1")
                .with_creation_time(now),
        ),
        (
            "cloud-nuke-test-2".to_string(),
            ResourceValue::new()
                .with_name("cloud-nuke-test-2")
                .with_creation_time(now + ChronoDuration::seconds(1)),
        ),
    ];
    let config = Config::new().with(
        "codedeploy-application",
        ResourceTypeConfig::new().exclude(FilterRule {
            time_after: Some(now - ChronoDuration::seconds(1)),
            ..Default::default()
        }),
    );
    let ctx = ExecutionContext::standalone("us-east-1");

    let ids = orchestrator::inspect(&controller, &config, &ctx).await.unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_discovery_error_records_nothing() {
    let mut controller = FakeController::new("ecr", &["a"]);
    controller.discovery_fails = true;
    let ctx = ExecutionContext::standalone("eu-west-1");

    let report = orchestrator::run(&controller, &Config::new(), &ctx).await;

    assert!(matches!(report.error, Some(SweepError::Discovery { .. })));
    assert!(ctx.ledger().is_empty());
}

#[tokio::test]
async fn test_transport_failure_fails_only_that_batch() {
    let mut controller = FakeController::new("cloudwatch-alarm", &["a", "b", "c", "d"]);
    controller.max_batch = 2;
    controller.transport_failing_batches.insert(0);
    let ctx = ExecutionContext::standalone("us-east-1");

    let report = orchestrator::run(&controller, &Config::new(), &ctx).await;

    assert_eq!(controller.batches().len(), 2);
    let entries = ctx.ledger().entries();
    assert_eq!(entries.len(), 4);
    assert!(matches!(
        entries[0].error,
        Some(SweepError::BatchTransport { .. })
    ));
    assert!(matches!(
        entries[1].error,
        Some(SweepError::BatchTransport { .. })
    ));
    assert!(entries[2].is_success());
    assert!(entries[3].is_success());
    assert_eq!(ctx.ledger().summary().failed, 2);
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_async_delete_waits_for_completion() {
    let mut controller = FakeController::new("rds-subnet-group", &["g1", "g2"]);
    controller.completion = Some(WaitPolicy::new(Duration::from_millis(1), 3));
    controller.still_present.insert("g1".to_string(), 2);
    controller.still_present.insert("g2".to_string(), 5);
    let ctx = ExecutionContext::standalone("us-east-1");

    let report = orchestrator::run(&controller, &Config::new(), &ctx).await;

    let entries = ctx.ledger().entries();
    assert!(entries[0].is_success());
    assert!(matches!(
        entries[1].error,
        Some(SweepError::DeletionTimeout { attempts: 3, .. })
    ));
    assert_eq!(controller.probes.lock().unwrap()["g1"], 3);
    assert_eq!(controller.probes.lock().unwrap()["g2"], 3);
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_failed_items_are_not_probed() {
    let mut controller = FakeController::new("dynamodb", &["t1", "t2"]);
    controller.completion = Some(WaitPolicy::new(Duration::from_millis(1), 3));
    controller.failing.insert("t1".to_string());
    let ctx = ExecutionContext::standalone("us-east-1");

    orchestrator::run(&controller, &Config::new(), &ctx).await;

    let probes = controller.probes.lock().unwrap();
    assert!(!probes.contains_key("t1"));
    assert_eq!(probes["t2"], 1);
}

#[tokio::test]
async fn test_cancellation_stops_further_batches() {
    let cancel = CancellationToken::new();
    let mut controller = FakeController::new("ecr", &["a", "b", "c", "d", "e"]);
    controller.max_batch = 2;
    controller.cancel_after_batch = Some(cancel.clone());
    let ctx = context_with(Arc::new(NoopTelemetry), cancel);

    let report = orchestrator::run(&controller, &Config::new(), &ctx).await;

    assert_eq!(controller.batches(), vec![vec!["a", "b"]]);
    assert!(report.cancelled);
    assert_eq!(report.skipped, 3);
    assert_eq!(ctx.ledger().len(), 2);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_runner_aggregates_units_across_regions() {
    let ok: Arc<dyn ResourceController> = Arc::new(FakeController::new("ecr", &["r1", "r2"]));
    let mut failing = FakeController::new("dynamodb", &["t1"]);
    failing.failing.insert("t1".to_string());
    let failing: Arc<dyn ResourceController> = Arc::new(failing);

    let runner = Runner::new(
        Arc::new(Config::new()),
        Arc::new(NoopTelemetry),
        CancellationToken::new(),
        RunnerConfig { max_concurrency: 2 },
    );
    let report = runner
        .run(vec![
            WorkUnit::new("us-east-1", Arc::clone(&ok)),
            WorkUnit::new("us-west-2", Arc::clone(&ok)),
            WorkUnit::new("us-east-1", failing),
        ])
        .await;

    assert_eq!(report.units.len(), 3);
    assert_eq!(report.summary.succeeded, 4);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.by_resource_type["ecr"].succeeded, 4);
    assert!(!report.is_success());
    assert_eq!(report.failed_units().count(), 1);
    assert_eq!(report.not_started_units().count(), 0);

    let regions: HashSet<_> = report.entries.iter().map(|e| e.region.as_str()).collect();
    assert!(regions.contains("us-west-2"));
}

#[tokio::test]
async fn test_runner_skips_units_after_cancel() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let controller = Arc::new(FakeController::new("ecr", &["r1"]));

    let runner = Runner::new(
        Arc::new(Config::new()),
        Arc::new(NoopTelemetry),
        cancel,
        RunnerConfig::default(),
    );
    let report = runner
        .run(vec![WorkUnit::new("us-east-1", controller.clone())])
        .await;

    assert!(report.cancelled);
    assert!(report.units[0].cancelled);
    assert!(!report.units[0].started);
    assert_eq!(report.not_started_units().count(), 1);
    assert!(report.entries.is_empty());
    assert!(controller.batches().is_empty());
}

#[tokio::test]
async fn test_runner_bounds_concurrency() {
    struct Gauge {
        current: AtomicU32,
        peak: AtomicU32,
    }

    struct SlowController {
        name: &'static str,
        gauge: Arc<Gauge>,
    }

    #[async_trait]
    impl ResourceController for SlowController {
        fn resource_name(&self) -> &str {
            self.name
        }

        fn max_batch_size(&self) -> usize {
            1
        }

        async fn discover(
            &self,
            _ctx: &ExecutionContext,
            _config: &Config,
        ) -> fleetsweep_core::Result<Vec<String>> {
            let now = self.gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.gauge.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.gauge.current.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn delete(
            &self,
            _ctx: &ExecutionContext,
            batch: &[String],
        ) -> fleetsweep_core::Result<Vec<ItemOutcome>> {
            Ok(batch.iter().map(ItemOutcome::accepted).collect())
        }
    }

    let gauge = Arc::new(Gauge {
        current: AtomicU32::new(0),
        peak: AtomicU32::new(0),
    });
    let units = (0..6)
        .map(|_| {
            let controller: Arc<dyn ResourceController> = Arc::new(SlowController {
                name: "ecr",
                gauge: Arc::clone(&gauge),
            });
            WorkUnit::new("us-east-1", controller)
        })
        .collect();

    let runner = Runner::new(
        Arc::new(Config::new()),
        Arc::new(NoopTelemetry),
        CancellationToken::new(),
        RunnerConfig { max_concurrency: 2 },
    );
    let report = runner.run(units).await;

    assert_eq!(report.units.len(), 6);
    assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_inspect_reports_discovery_errors() {
    let mut broken = FakeController::new("ecr", &["a"]);
    broken.discovery_fails = true;
    let good: Arc<dyn ResourceController> = Arc::new(FakeController::new("dynamodb", &["t1", "t2"]));

    let runner = Runner::new(
        Arc::new(Config::new()),
        Arc::new(NoopTelemetry),
        CancellationToken::new(),
        RunnerConfig::default(),
    );
    let inventory = runner
        .inspect(vec![
            WorkUnit::new("us-east-1", Arc::new(broken)),
            WorkUnit::new("us-east-1", good),
        ])
        .await;

    assert_eq!(inventory.total(), 2);
    assert_eq!(inventory.errors.len(), 1);
    assert_eq!(
        inventory.found[&("us-east-1".to_string(), "dynamodb".to_string())],
        vec!["t1", "t2"]
    );
}
