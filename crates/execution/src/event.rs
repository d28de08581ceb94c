use chrono::{DateTime, Utc};
use iceos_core::{ExecutionId, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every state transition the runtime reports. Payloads are JSON so event
/// subscribers don't need a compiled-in copy of this enum to read a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    RunStarted,
    NodeStarted { node_id: NodeId },
    NodeRetrying { node_id: NodeId, attempt: u32 },
    NodeSucceeded { node_id: NodeId },
    NodeFailed { node_id: NodeId, error_type: String },
    BranchDecision { node_id: NodeId, taken: bool },
    RecursionRound { node_id: NodeId, round: u32 },
    HumanApprovalRequested { node_id: NodeId },
    HumanApprovalResolved { node_id: NodeId, approved: bool },
    BudgetWarning { counter: String },
    RunCompleted,
    RunFailed { node_id: Option<NodeId> },
    RunCanceled,
}

impl EventKind {
    /// The last event of a run is always one of these three, enforced by the
    /// scheduler, never by this type — documented here so a store
    /// implementation knows what terminal marker to watch for.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunCompleted | Self::RunFailed { .. } | Self::RunCanceled)
    }
}

/// A single ordered event in a run's stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub execution_id: ExecutionId,
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub kind: EventKind,
    pub payload: Value,
}

impl Event {
    #[must_use]
    pub fn new(execution_id: ExecutionId, seq: u64, kind: EventKind) -> Self {
        Self { execution_id, seq, ts: Utc::now(), kind, payload: Value::Null }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events_are_classified() {
        assert!(EventKind::RunCompleted.is_terminal());
        assert!(EventKind::RunCanceled.is_terminal());
        assert!(EventKind::RunFailed { node_id: None }.is_terminal());
        assert!(!EventKind::RunStarted.is_terminal());
    }

    #[test]
    fn serde_tag_uses_snake_case() {
        let event = EventKind::NodeStarted { node_id: NodeId::new("n1") };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"node_started\""));
    }
}
