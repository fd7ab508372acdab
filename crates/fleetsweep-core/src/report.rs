//! Outcome ledger
//!
//! Append-only record of every attempted deletion, shared by all units of
//! work in a run and read once they have all finished.

use crate::error::SweepError;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Result of one attempted deletion
#[derive(Debug, Clone)]
pub struct OutcomeEntry {
    pub identifier: String,
    pub resource_type: String,
    pub region: String,
    pub error: Option<SweepError>,
}

impl OutcomeEntry {
    pub fn success(
        identifier: impl Into<String>,
        resource_type: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            resource_type: resource_type.into(),
            region: region.into(),
            error: None,
        }
    }

    pub fn failure(
        identifier: impl Into<String>,
        resource_type: impl Into<String>,
        region: impl Into<String>,
        error: SweepError,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            resource_type: resource_type.into(),
            region: region.into(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Counts for one resource kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// End-of-run counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub by_resource_type: BTreeMap<String, KindSummary>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} deleted, {} failed", self.succeeded, self.failed)
    }
}

/// Thread-safe, append-only list of outcomes
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<Vec<OutcomeEntry>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OutcomeEntry>> {
        // A panicking writer cannot leave a half-pushed entry behind
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, entry: OutcomeEntry) {
        self.lock().push(entry);
    }

    /// Entries in the order they were recorded
    pub fn entries(&self) -> Vec<OutcomeEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        let entries = self.lock();
        let mut summary = RunSummary::default();
        for entry in entries.iter() {
            let kind = summary
                .by_resource_type
                .entry(entry.resource_type.clone())
                .or_default();
            if entry.is_success() {
                summary.succeeded += 1;
                kind.succeeded += 1;
            } else {
                summary.failed += 1;
                kind.failed += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_summary_counts_by_kind() {
        let ledger = Ledger::new();
        ledger.record(OutcomeEntry::success("a", "ecr", "us-east-1"));
        ledger.record(OutcomeEntry::success("b", "ecr", "us-east-1"));
        ledger.record(OutcomeEntry::failure(
            "t",
            "dynamodb",
            "us-west-2",
            SweepError::DeletionTimeout {
                resource_type: "dynamodb".to_string(),
                identifier: "t".to_string(),
                attempts: 2,
            },
        ));

        let summary = ledger.summary();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(
            summary.by_resource_type["ecr"],
            KindSummary {
                succeeded: 2,
                failed: 0
            }
        );
        assert_eq!(summary.by_resource_type["dynamodb"].failed, 1);
        assert_eq!(summary.to_string(), "2 deleted, 1 failed");
    }

    #[test]
    fn test_entries_keep_record_order() {
        let ledger = Ledger::new();
        for id in ["1", "2", "3"] {
            ledger.record(OutcomeEntry::success(id, "ecr", "r"));
        }
        let ids: Vec<_> = ledger.entries().into_iter().map(|e| e.identifier).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_concurrent_writers() {
        let ledger = Arc::new(Ledger::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        ledger.record(OutcomeEntry::success(format!("{}-{}", t, i), "ecr", "r"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.len(), 800);
        assert_eq!(ledger.summary().succeeded, 800);
    }
}
