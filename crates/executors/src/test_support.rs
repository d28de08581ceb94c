//! Shared `WorkflowRuntime` test double, used by every executor's unit
//! tests in this crate.

use std::sync::Arc;

use async_trait::async_trait;
use iceos_core::NodeId;
use iceos_error::IceError;
use iceos_execution::{BudgetEnforcer, BudgetLimits, BudgetPolicy, EventKind, MemoryStore, RunContext};
use iceos_registry::{AgentFactory, ExecutorRegistry, LlmProvider, Tool, WorkflowRuntime};
use iceos_workflow::NodeSpec;
use serde_json::Value;
use tokio::sync::Mutex;

pub struct TestRuntime {
    pub registry: ExecutorRegistry,
    pub budget: BudgetEnforcer,
    pub subgraph_result: Mutex<Option<Result<Value, IceError>>>,
    pub events: Mutex<Vec<EventKind>>,
}

impl TestRuntime {
    pub fn new() -> Self {
        Self {
            registry: ExecutorRegistry::new(true),
            budget: BudgetEnforcer::new(BudgetLimits::default(), BudgetPolicy::FailClosed),
            subgraph_result: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn with_budget(mut self, limits: BudgetLimits) -> Self {
        self.budget = BudgetEnforcer::new(limits, BudgetPolicy::FailClosed);
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.registry.register_tool(tool).unwrap();
        self
    }

    pub fn with_agent(mut self, factory: Arc<dyn AgentFactory>) -> Self {
        self.registry.register_agent_factory(factory).unwrap();
        self
    }

    pub fn with_llm(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.registry.register_llm(provider).unwrap();
        self
    }

    pub fn returning_subgraph(self, result: Result<Value, IceError>) -> Self {
        *self.subgraph_result.try_lock().unwrap() = Some(result);
        self
    }
}

#[async_trait]
impl WorkflowRuntime for TestRuntime {
    fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    fn budget(&self) -> &BudgetEnforcer {
        &self.budget
    }

    fn memory(&self) -> Option<&dyn MemoryStore> {
        None
    }

    async fn run_subgraph(&self, _nodes: &[NodeSpec], _ctx: &RunContext) -> Result<Value, IceError> {
        self.subgraph_result
            .lock()
            .await
            .clone()
            .unwrap_or_else(|| Err(IceError::internal("no subgraph result configured for this test")))
    }

    async fn emit(&self, kind: EventKind, _node_id: Option<NodeId>, _payload: Value) {
        self.events.lock().await.push(kind);
    }
}
