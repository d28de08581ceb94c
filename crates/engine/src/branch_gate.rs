use std::collections::HashSet;

use iceos_core::NodeId;
use iceos_workflow::NodeSpec;
use parking_lot::Mutex;

/// Tracks which nodes are inactive for the rest of a single DAG run.
///
/// `condition`/`loop`/`parallel` branch selection is already fully expressed
/// by a node's own inline `true_path`/`false_path`/`body`/`branches` lists —
/// a sibling node has no field declaring membership in another node's
/// branch, so there is nothing for a top-level resolver to gate there; the
/// executor that owns the branch decides which inline list to run via
/// `WorkflowRuntime::run_subgraph` and the nodes outside that list simply
/// never exist in the executed subgraph. What this resolver gates instead is
/// failure propagation: once a node is marked inactive, every node whose
/// `dependencies` include it is blocked too, without needing to walk the
/// full transitive closure by hand, because levels are processed in
/// topological order — by the time a node's level runs, any inactive
/// ancestor has already propagated its inactivity to that node's direct
/// predecessors.
pub struct BranchGatingResolver {
    inactive: Mutex<HashSet<NodeId>>,
}

impl BranchGatingResolver {
    #[must_use]
    pub fn new() -> Self {
        Self { inactive: Mutex::new(HashSet::new()) }
    }

    pub fn mark_inactive(&self, node_id: NodeId) {
        self.inactive.lock().insert(node_id);
    }

    #[must_use]
    pub fn is_inactive(&self, node_id: &NodeId) -> bool {
        self.inactive.lock().contains(node_id)
    }

    /// Whether `node` is blocked because at least one of its direct
    /// dependencies is already inactive.
    #[must_use]
    pub fn blocked(&self, node: &NodeSpec) -> bool {
        let inactive = self.inactive.lock();
        node.dependencies.iter().any(|dep| inactive.contains(dep))
    }
}

impl Default for BranchGatingResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iceos_workflow::NodeKind;
    use serde_json::Value;

    fn tool(id: &str, deps: &[&str]) -> NodeSpec {
        NodeSpec::new(
            NodeId::new(id),
            deps.iter().map(|d| NodeId::new(*d)).collect(),
            NodeKind::Tool { tool_name: "echo".into(), tool_args: Value::Null },
        )
    }

    #[test]
    fn node_with_no_inactive_dependency_is_not_blocked() {
        let gate = BranchGatingResolver::new();
        assert!(!gate.blocked(&tool("b", &["a"])));
    }

    #[test]
    fn marking_a_dependency_inactive_blocks_its_dependent() {
        let gate = BranchGatingResolver::new();
        gate.mark_inactive(NodeId::new("a"));
        assert!(gate.blocked(&tool("b", &["a"])));
        assert!(!gate.blocked(&tool("c", &["x"])));
    }

    #[test]
    fn unrelated_node_stays_active() {
        let gate = BranchGatingResolver::new();
        gate.mark_inactive(NodeId::new("a"));
        assert!(!gate.is_inactive(&NodeId::new("b")));
    }
}
