//! Fire-and-forget failure events
//!
//! Emission never blocks the deletion path and never fails it: sinks drop
//! events they cannot deliver.

use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One notable event, e.g. a failed deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Event emitted when one resource fails to delete
    pub fn deletion_failed(resource_type: &str, region: &str, identifier: &str) -> Self {
        Self::new(format!("error-nuking-{}", resource_type))
            .with_attribute("resource_type", resource_type)
            .with_attribute("region", region)
            .with_attribute("identifier", identifier)
    }
}

/// Destination for telemetry events
pub trait TelemetrySink: Send + Sync {
    /// Must return immediately; delivery is best-effort
    fn emit(&self, event: TelemetryEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Queues events on a bounded channel drained by a background task
///
/// When the queue is full or the drain task is gone, events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelTelemetry {
    sender: mpsc::Sender<TelemetryEvent>,
}

impl ChannelTelemetry {
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create a sink and the receiving half, for callers that forward events themselves
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TelemetryEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Create a sink whose events are written to the `telemetry` tracing target
    ///
    /// The returned handle finishes once every sink clone is dropped.
    pub fn spawn_logging(capacity: usize) -> (Self, JoinHandle<usize>) {
        let (sink, mut receiver) = Self::channel(capacity);
        let handle = tokio::spawn(async move {
            let mut delivered = 0usize;
            while let Some(event) = receiver.recv().await {
                tracing::debug!(
                    target: "telemetry",
                    event = %event.name,
                    attributes = ?event.attributes,
                    "Telemetry event"
                );
                delivered += 1;
            }
            delivered
        });
        (sink, handle)
    }
}

impl TelemetrySink for ChannelTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        if let Err(e) = self.sender.try_send(event) {
            tracing::trace!(error = %e, "Dropped telemetry event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_failed_event() {
        let event = TelemetryEvent::deletion_failed("ecr", "us-east-1", "repo");
        assert_eq!(event.name, "error-nuking-ecr");
        assert_eq!(event.attributes.get("region").unwrap(), "us-east-1");
        assert_eq!(event.attributes.get("identifier").unwrap(), "repo");
    }

    #[tokio::test]
    async fn test_channel_never_blocks_when_full() {
        let (sink, mut receiver) = ChannelTelemetry::channel(2);
        for i in 0..10 {
            sink.emit(TelemetryEvent::new(format!("event-{}", i)));
        }
        drop(sink);

        let mut received = Vec::new();
        while let Some(event) = receiver.recv().await {
            received.push(event.name);
        }
        assert_eq!(received, vec!["event-0", "event-1"]);
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_swallowed() {
        let (sink, receiver) = ChannelTelemetry::channel(4);
        drop(receiver);
        sink.emit(TelemetryEvent::new("lost"));
    }

    #[tokio::test]
    async fn test_spawn_logging_drains_events() {
        let (sink, handle) = ChannelTelemetry::spawn_logging(8);
        sink.emit(TelemetryEvent::new("a"));
        sink.emit(TelemetryEvent::new("b"));
        drop(sink);
        assert_eq!(handle.await.unwrap(), 2);
    }
}
