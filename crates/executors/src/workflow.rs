use std::time::Instant;

use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{NodeExecutionResult, NodeOutputData, RunContext};
use iceos_registry::{NodeExecutor, WorkflowRuntime};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;

use crate::support::metadata;

/// Resolves a registered [`iceos_workflow::Blueprint`] by `workflow_ref` and
/// runs it as a nested subgraph, scoped to the node's resolved input per the
/// "only inputs by default" rule — exporting/importing wider state is the
/// caller's responsibility via `input_mappings` on this node and its
/// dependents.
pub struct WorkflowExecutor;

#[async_trait]
impl NodeExecutor for WorkflowExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        ctx: &RunContext,
        input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Workflow { workflow_ref } = &node.kind else {
            return Err(IceError::internal("WorkflowExecutor invoked on a non-workflow node"));
        };
        let blueprint = runtime
            .registry()
            .get_workflow(workflow_ref)
            .ok_or_else(|| IceError::registry(format!("no workflow registered for '{workflow_ref}'")))?;

        let start = Instant::now();
        let child_ctx = RunContext::new(input).with_identity(ctx.org_id.clone(), ctx.user_id.clone(), ctx.session_id.clone());
        let output = runtime.run_subgraph(&blueprint.nodes, &child_ctx).await?;

        Ok(NodeExecutionResult::success(NodeOutputData::inline(output), metadata(1, start, false)))
    }
}
