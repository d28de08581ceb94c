use async_trait::async_trait;
use iceos_core::NodeId;
use iceos_error::IceError;
use iceos_execution::{BudgetEnforcer, EventKind, MemoryStore, RunContext};
use iceos_workflow::NodeSpec;
use serde_json::Value;

use crate::registry::ExecutorRegistry;

/// A small facade handed to every executor, breaking the otherwise-cyclic
/// dependency between the scheduler, the executors, and the registry: an
/// executor depends only on this trait, never on the concrete scheduler
/// type.
#[async_trait]
pub trait WorkflowRuntime: Send + Sync {
    fn registry(&self) -> &ExecutorRegistry;

    fn budget(&self) -> &BudgetEnforcer;

    /// `None` when no memory backend is configured for this deployment;
    /// `memory_aware` nodes then behave as if no hits were found.
    fn memory(&self) -> Option<&dyn MemoryStore>;

    /// Recursively runs a nested node list (a `loop` body, a `parallel`
    /// branch, a `condition` inline path, ...) to completion and returns the
    /// aggregated output of its exit nodes.
    async fn run_subgraph(&self, nodes: &[NodeSpec], ctx: &RunContext) -> Result<Value, IceError>;

    /// Appends an event to the run's stream. Fire-and-forget from the
    /// executor's point of view; the runtime is responsible for durability.
    async fn emit(&self, kind: EventKind, node_id: Option<NodeId>, payload: Value);
}
