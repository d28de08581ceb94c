use std::sync::Arc;

use async_trait::async_trait;
use iceos_error::IceError;
use serde_json::Value;

use crate::tool::Tool;

/// One decision produced by an agent's `step`: either call a tool or stop
/// with a final answer. The `agent` executor's state machine
/// (`Thinking -> CallingTool -> AwaitingTool -> Finalizing -> Done`) drives
/// repeated calls to `step` until `FinalAnswer`, `max_iterations`, budget
/// exhaustion, or cancellation.
#[derive(Debug, Clone)]
pub enum AgentStep {
    ToolCall { tool_name: String, args: Value },
    FinalAnswer(Value),
}

/// A running agent instance, bound to a fixed tool subset at creation.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Advances the agent one step given the transcript so far (the agent's
    /// own scratch format; this runtime never interprets it beyond passing
    /// it back on the next call).
    async fn step(&self, transcript: &Value) -> Result<AgentStep, IceError>;
}

/// Resolved by `package` from an `agent` node; instantiates an [`Agent`]
/// scoped to the node's declared tool subset.
pub trait AgentFactory: Send + Sync {
    fn package(&self) -> &str;
    fn create(&self, tools: Vec<Arc<dyn Tool>>) -> Arc<dyn Agent>;
}
