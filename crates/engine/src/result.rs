use std::collections::HashMap;

use iceos_core::{ExecutionId, NodeId};
use iceos_execution::{ExecutionStatus, NodeExecutionResult};

/// The outcome of one top-level [`crate::scheduler::WorkflowScheduler::run`]
/// call. Carries every node's result, not just the failed one, so a caller
/// can inspect partial progress after a `ContinuePossible`/`Always` run.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub execution_id: ExecutionId,
    pub status: ExecutionStatus,
    pub failed_node: Option<NodeId>,
    pub node_results: HashMap<NodeId, NodeExecutionResult>,
    pub duration_ms: u64,
}

impl WorkflowResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[must_use]
    pub fn node_output(&self, node_id: &NodeId) -> Option<&NodeExecutionResult> {
        self.node_results.get(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iceos_execution::NodeMetadata;
    use serde_json::json;

    #[test]
    fn is_success_follows_status() {
        let result = WorkflowResult {
            execution_id: ExecutionId::new(),
            status: ExecutionStatus::Completed,
            failed_node: None,
            node_results: HashMap::new(),
            duration_ms: 5,
        };
        assert!(result.is_success());
    }

    #[test]
    fn node_output_looks_up_by_id() {
        let mut node_results = HashMap::new();
        let id = NodeId::new("n1");
        node_results.insert(
            id.clone(),
            NodeExecutionResult::success(
                iceos_execution::NodeOutputData::inline(json!("ok")),
                NodeMetadata { attempt: 1, duration_ms: 1, cache_hit: false },
            ),
        );
        let result = WorkflowResult {
            execution_id: ExecutionId::new(),
            status: ExecutionStatus::Completed,
            failed_node: None,
            node_results,
            duration_ms: 1,
        };
        assert!(result.node_output(&id).is_some());
        assert!(result.node_output(&NodeId::new("ghost")).is_none());
    }
}
