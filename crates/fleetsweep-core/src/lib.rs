//! FleetSweep core
//!
//! This crate holds the provider-independent part of FleetSweep: the rules
//! deciding which discovered resources may be deleted, and the machinery
//! that deletes them in batches while isolating per-resource failures.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Runner (worker pool)                 │
//! │        one unit of work per (kind, region)           │
//! └─────────────────────────┬────────────────────────────┘
//!                           │
//! ┌─────────────────────────▼────────────────────────────┐
//! │                    orchestrator::run                  │
//! │  discover ─► filter ─► partition ─► delete ─► wait    │
//! └───────┬──────────────────┬───────────────────┬───────┘
//!         │                  │                   │
//! ┌───────▼───────┐  ┌───────▼───────┐   ┌───────▼───────┐
//! │  Resource     │  │    Ledger     │   │   Telemetry   │
//! │  Controller   │  │  (outcomes)   │   │     sink      │
//! └───────────────┘  └───────────────┘   └───────────────┘
//! ```
//!
//! Provider crates (e.g., `fleetsweep-aws`) implement [`ResourceController`]
//! once per resource kind.

pub mod context;
pub mod controller;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod telemetry;
pub mod waiter;

// Re-exports
pub use context::ExecutionContext;
pub use controller::{ItemOutcome, ProbeStatus, ResourceController, WaitPolicy};
pub use error::{AggregateError, Cause, Result, SweepError};
pub use filter::{
    AgeWindow, Config, FilterRule, NamePattern, ResourceTypeConfig, ResourceValue, should_include,
};
pub use orchestrator::{UnitReport, partition};
pub use report::{KindSummary, Ledger, OutcomeEntry, RunSummary};
pub use runner::{Inventory, RunReport, Runner, RunnerConfig, WorkUnit};
pub use telemetry::{ChannelTelemetry, NoopTelemetry, TelemetryEvent, TelemetrySink};
pub use waiter::wait_until_gone;
