use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use iceos_core::{ExecutionId, NodeId};
use iceos_error::IceError;
use iceos_execution::{
    BudgetEnforcer, Event, EventKind, Execution, ExecutionStatus, ExecutionStore, MemoryStore,
    NodeExecutionResult, RunContext,
};
use iceos_registry::{ExecutorRegistry, WorkflowRuntime};
use iceos_telemetry::{EventBus, EventSubscriber, MetricsRegistry};
use iceos_workflow::{Blueprint, DependencyGraph, NodeSpec};
use semver::Version;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::branch_gate::BranchGatingResolver;
use crate::cache::NodeCache;
use crate::node_executor::{execute_node, ExecCx};
use crate::options::{FailurePolicy, RunOptions};
use crate::result::WorkflowResult;

/// One topological-level pass over a node slice: every node's result,
/// whichever node triggered a fatal failure first (if any), and whether the
/// run was cancelled mid-flight.
struct DagOutcome {
    results: HashMap<NodeId, NodeExecutionResult>,
    failed_node: Option<NodeId>,
    canceled: bool,
}

/// Runs one blueprint to completion. Owns the per-run cache, event bus, and
/// cancellation token; a nested `condition`/`loop`/`parallel`/`workflow`
/// executor recurses back into this same scheduler through
/// [`WorkflowRuntime::run_subgraph`] rather than spinning up a child
/// scheduler, so the cache, budget, and event stream stay shared across the
/// whole run.
pub struct WorkflowScheduler {
    blueprint: Blueprint,
    topology_hash: String,
    registry: ExecutorRegistry,
    budget: BudgetEnforcer,
    memory: Option<Arc<dyn MemoryStore>>,
    store: Option<Arc<dyn ExecutionStore>>,
    bus: EventBus,
    metrics: MetricsRegistry,
    cache: NodeCache,
    cancel: CancellationToken,
    semaphore: Semaphore,
    options: RunOptions,
}

impl WorkflowScheduler {
    /// Validates the blueprint and fingerprints its topology once, up front,
    /// so every node execution and cache lookup during the run reuses the
    /// same hash rather than recomputing it.
    pub fn new(
        blueprint: Blueprint,
        registry: ExecutorRegistry,
        budget: BudgetEnforcer,
        options: RunOptions,
    ) -> Result<Self, IceError> {
        iceos_workflow::validate(&blueprint)?;
        let topology_hash = iceos_workflow::topology_hash(&blueprint)?;
        let execution_id = ExecutionId::new();
        let semaphore = Semaphore::new(options.max_parallel.max(1));
        let bus = EventBus::new(execution_id, options.event_bus_capacity);

        Ok(Self {
            blueprint,
            topology_hash,
            registry,
            budget,
            memory: None,
            store: None,
            bus,
            metrics: MetricsRegistry::new(),
            cache: NodeCache::new(),
            cancel: CancellationToken::new(),
            semaphore,
            options,
        })
    }

    #[must_use]
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        self.bus.execution_id()
    }

    #[must_use]
    pub fn subscribe(&self) -> EventSubscriber {
        self.bus.subscribe()
    }

    /// The run's metrics registry: `runs_completed_total`,
    /// `runs_failed_total`, `nodes_executed_total`,
    /// `nodes_failed_total`, `run_duration_ms` are the names this
    /// scheduler itself writes to; a caller is free to read any of them
    /// or register its own.
    #[must_use]
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// A clone of the run's cancellation token; dropping/cancelling it from
    /// outside this scheduler stops the run at its next level boundary.
    #[must_use]
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the whole blueprint from its entry nodes to completion,
    /// persisting the `Execution` record's status transitions and emitting
    /// the run-level event bookends.
    pub async fn run(&self, ctx: &RunContext) -> Result<WorkflowResult, IceError> {
        let start = Instant::now();
        let execution_id = self.execution_id();

        if let Some(store) = &self.store {
            let mut run = Execution::new(self.blueprint.id.clone());
            run.id = execution_id;
            run.status = ExecutionStatus::Running;
            run.started_at = Some(Utc::now());
            store.create(&run).await?;
        }

        WorkflowRuntime::emit(self, EventKind::RunStarted, None, Value::Null).await;

        let nodes = self.blueprint.nodes.clone();
        let outcome = self.execute_dag(&nodes, ctx).await?;

        let status = final_status(&outcome);
        let terminal_kind = match status {
            ExecutionStatus::Completed => EventKind::RunCompleted,
            ExecutionStatus::Cancelled => EventKind::RunCanceled,
            _ => EventKind::RunFailed { node_id: outcome.failed_node.clone() },
        };
        WorkflowRuntime::emit(self, terminal_kind, None, Value::Null).await;

        if let Some(store) = &self.store {
            store.update_status(&execution_id, status).await?;
        }

        let duration_ms = elapsed_ms(start);
        self.metrics.histogram("run_duration_ms").observe(duration_ms as f64);
        if status.is_success() {
            self.metrics.counter("runs_completed_total").inc();
        } else {
            self.metrics.counter("runs_failed_total").inc();
        }

        Ok(WorkflowResult {
            execution_id,
            status,
            failed_node: outcome.failed_node,
            node_results: outcome.results,
            duration_ms,
        })
    }

    /// Runs one flat node slice level by level, bounded by `max_parallel`
    /// across the whole scheduler (shared with any sibling subgraph, since
    /// the semaphore lives on `self`, not on this call). Every node future
    /// borrows `self`/`ctx` directly instead of being spawned onto the
    /// runtime's task pool, which avoids forcing `'static` + `Arc` ownership
    /// of the registry/budget/cache just to satisfy `tokio::spawn`.
    async fn execute_dag(&self, nodes: &[NodeSpec], ctx: &RunContext) -> Result<DagOutcome, IceError> {
        let sub_blueprint = Blueprint::new("subgraph", Version::new(0, 0, 0), nodes.to_vec());
        let graph = DependencyGraph::from_blueprint(&sub_blueprint)?;
        let levels = graph.levels()?;
        let node_map: HashMap<&NodeId, &NodeSpec> = nodes.iter().map(|n| (&n.id, n)).collect();

        let gate = BranchGatingResolver::new();
        let mut results = HashMap::with_capacity(nodes.len());
        let mut failed_node: Option<NodeId> = None;
        let mut canceled = false;

        for level in levels {
            if self.cancel.is_cancelled() {
                canceled = true;
                break;
            }
            if failed_node.is_some() && self.options.failure_policy == FailurePolicy::Halt {
                break;
            }

            let mut pending = FuturesUnordered::new();
            for node_id in &level {
                let Some(&node) = node_map.get(node_id) else { continue };

                let halted_by_policy = failed_node.is_some() && self.options.failure_policy != FailurePolicy::Always;
                if gate.blocked(node) || halted_by_policy {
                    gate.mark_inactive(node.id.clone());
                    results.insert(node.id.clone(), canceled_result());
                    continue;
                }

                let cx = ExecCx { runtime: self, cache: &self.cache, topology_hash: &self.topology_hash, cancel: &self.cancel, data_policy: &self.options.data_policy };
                pending.push(async move {
                    let _permit = self.semaphore.acquire().await.expect("scheduler semaphore never closes");
                    let result = execute_node(cx, node, ctx).await;
                    (node.id.clone(), result)
                });
            }

            while let Some((node_id, result)) = pending.next().await {
                self.metrics.counter("nodes_executed_total").inc();
                if !result.success {
                    self.metrics.counter("nodes_failed_total").inc();
                    failed_node.get_or_insert_with(|| node_id.clone());
                    gate.mark_inactive(node_id.clone());
                }
                results.insert(node_id, result);
            }
        }

        Ok(DagOutcome { results, failed_node, canceled })
    }
}

fn final_status(outcome: &DagOutcome) -> ExecutionStatus {
    if outcome.canceled {
        ExecutionStatus::Cancelled
    } else if outcome.failed_node.is_some() {
        ExecutionStatus::Failed
    } else {
        ExecutionStatus::Completed
    }
}

fn canceled_result() -> NodeExecutionResult {
    let err = IceError::canceled(Some("blocked by an upstream failure".to_owned()));
    NodeExecutionResult::failure(
        err.to_string(),
        err.error_code(),
        iceos_execution::NodeMetadata { attempt: 0, duration_ms: 0, cache_hit: false },
    )
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Aggregates a subgraph's exit-node outputs into the single `Value` that
/// `run_subgraph` returns to the executor that invoked it: no exit nodes
/// means `Null`, exactly one means that node's output directly, and more
/// than one merges every exit node's output into an object keyed by node
/// id — the same 0/1/N shape `assemble_input`'s positional rule uses for a
/// node's own dependencies.
fn aggregate_subgraph_output(nodes: &[NodeSpec], ctx: &RunContext) -> Result<Value, IceError> {
    let sub_blueprint = Blueprint::new("subgraph", Version::new(0, 0, 0), nodes.to_vec());
    let graph = DependencyGraph::from_blueprint(&sub_blueprint)?;
    let exits = graph.exit_nodes();

    match exits.as_slice() {
        [] => Ok(Value::Null),
        [only] => Ok(output_or_null(ctx, only)),
        many => {
            let mut map = serde_json::Map::with_capacity(many.len());
            for id in many {
                map.insert(id.to_string(), output_or_null(ctx, id));
            }
            Ok(Value::Object(map))
        }
    }
}

fn output_or_null(ctx: &RunContext, node_id: &NodeId) -> Value {
    ctx.output_of(node_id).and_then(|output| output.as_inline().cloned()).unwrap_or(Value::Null)
}

#[async_trait]
impl WorkflowRuntime for WorkflowScheduler {
    fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    fn budget(&self) -> &BudgetEnforcer {
        &self.budget
    }

    fn memory(&self) -> Option<&dyn MemoryStore> {
        self.memory.as_deref()
    }

    async fn run_subgraph(&self, nodes: &[NodeSpec], ctx: &RunContext) -> Result<Value, IceError> {
        if nodes.is_empty() {
            return Ok(Value::Null);
        }

        let outcome = self.execute_dag(nodes, ctx).await?;
        if outcome.canceled {
            return Err(IceError::canceled(Some("subgraph run was cancelled".to_owned())));
        }
        if let Some(failed) = &outcome.failed_node {
            let message = outcome
                .results
                .get(failed)
                .and_then(|r| r.error.clone())
                .unwrap_or_else(|| format!("node '{failed}' failed"));
            return Err(IceError::internal(message));
        }

        aggregate_subgraph_output(nodes, ctx)
    }

    async fn emit(&self, kind: EventKind, node_id: Option<NodeId>, payload: Value) {
        let event: Event = self.bus.emit(kind, payload);
        if let Some(id) = &node_id {
            tracing::trace!(execution_id = %event.execution_id, seq = event.seq, %id, "engine event");
        }
        if let Some(store) = &self.store {
            if let Err(err) = store.append_event(&event).await {
                tracing::warn!(execution_id = %event.execution_id, %err, "failed to persist event");
            }
        }
    }
}
