use std::time::Instant;

use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{NodeExecutionResult, NodeOutputData, RunContext};
use iceos_registry::{NodeExecutor, WorkflowRuntime};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;

use crate::support::{metadata, resolve_dotted};

/// Resolves `items_source` from the run's snapshot, then for each item (up
/// to `max_iterations`) binds `item_var` into a fresh child context and
/// runs `body` as a nested subgraph, collecting one output per iteration.
pub struct LoopExecutor;

#[async_trait]
impl NodeExecutor for LoopExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        ctx: &RunContext,
        _input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Loop { items_source, item_var, body, max_iterations } = &node.kind else {
            return Err(IceError::internal("LoopExecutor invoked on a non-loop node"));
        };

        let start = Instant::now();
        let snapshot = ctx.snapshot();
        let items = resolve_dotted(&snapshot, items_source)
            .and_then(Value::as_array)
            .ok_or_else(|| IceError::input_unresolved(node.id.to_string(), format!("'{items_source}' does not resolve to a list")))?
            .clone();

        let mut outputs = Vec::with_capacity(items.len());
        for item in items.into_iter().take(*max_iterations as usize) {
            let mut inputs_map = serde_json::Map::with_capacity(1);
            inputs_map.insert(item_var.clone(), item);
            let child_inputs = Value::Object(inputs_map);
            let child_ctx = RunContext::new(child_inputs).with_identity(ctx.org_id.clone(), ctx.user_id.clone(), ctx.session_id.clone());
            outputs.push(runtime.run_subgraph(body, &child_ctx).await?);
        }

        Ok(NodeExecutionResult::success(NodeOutputData::inline(Value::Array(outputs)), metadata(1, start, false)))
    }
}
