use std::sync::atomic::{AtomicU64, Ordering};

use iceos_core::ExecutionId;
use iceos_execution::{Event, EventKind};
use serde_json::Value;
use tokio::sync::broadcast;

/// Per-run broadcast bus carrying the ordered event stream. One bus is
/// created per execution; `seq` starts at zero and is monotonic for the
/// lifetime of the bus. Delivery is fire-and-forget: an emit with no active
/// subscribers is not an error, matching the durability requirement that
/// persistence (via `ExecutionStore::append_event`) is the source of truth,
/// not this bus.
pub struct EventBus {
    execution_id: ExecutionId,
    sender: broadcast::Sender<Event>,
    seq: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new(execution_id: ExecutionId, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { execution_id, sender, seq: AtomicU64::new(0) }
    }

    /// Assigns the next sequence number, logs a tracing event at a severity
    /// matching the kind, and broadcasts to subscribers. Returns the
    /// constructed `Event` so the caller can also persist it.
    pub fn emit(&self, kind: EventKind, payload: Value) -> Event {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let event = Event::new(self.execution_id.clone(), seq, kind).with_payload(payload);
        log_event(&event);
        let _ = self.sender.send(event.clone());
        event
    }

    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber { receiver: self.sender.subscribe() }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn log_event(event: &Event) {
    match &event.kind {
        EventKind::NodeFailed { node_id, error_type } => {
            tracing::warn!(execution_id = %event.execution_id, seq = event.seq, %node_id, error_type, "node failed");
        }
        EventKind::RunFailed { node_id } => {
            tracing::error!(execution_id = %event.execution_id, seq = event.seq, ?node_id, "run failed");
        }
        EventKind::BudgetWarning { counter } => {
            tracing::warn!(execution_id = %event.execution_id, seq = event.seq, counter, "budget warning");
        }
        other => {
            tracing::debug!(execution_id = %event.execution_id, seq = event.seq, kind = ?other, "event emitted");
        }
    }
}

/// Subscription handle. `recv` transparently skips lagged gaps rather than
/// surfacing `RecvError::Lagged` to the caller; a subscriber that falls
/// behind sees a discontinuous `seq` rather than an error.
pub struct EventSubscriber {
    receiver: broadcast::Receiver<Event>,
}

impl EventSubscriber {
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
