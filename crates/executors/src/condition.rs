use std::time::Instant;

use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{EventKind, NodeExecutionResult, NodeOutputData, RunContext};
use iceos_expression::Expression;
use iceos_registry::{NodeExecutor, WorkflowRuntime};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;

use crate::support::metadata;

/// Evaluates `expression` under the narrow boolean DSL, records the branch
/// decision, and optionally runs an inline `true_path`/`false_path` without
/// requiring the caller to declare them as separate sibling nodes.
pub struct ConditionExecutor;

#[async_trait]
impl NodeExecutor for ConditionExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        ctx: &RunContext,
        _input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Condition { expression, true_path, false_path } = &node.kind else {
            return Err(IceError::internal("ConditionExecutor invoked on a non-condition node"));
        };

        let start = Instant::now();
        let parsed = Expression::parse(expression).map_err(|err| IceError::validation(err.to_string()))?;
        let taken = parsed.evaluate_bool(&ctx.snapshot()).map_err(|err| IceError::validation(err.to_string()))?;

        runtime.emit(EventKind::BranchDecision { node_id: node.id.clone(), taken }, Some(node.id.clone()), Value::Null).await;

        let branch = if taken { true_path } else { false_path };
        let branch_output = if branch.is_empty() { Value::Null } else { runtime.run_subgraph(branch, ctx).await? };

        Ok(NodeExecutionResult::success(
            NodeOutputData::inline(serde_json::json!({"taken": taken, "branch_output": branch_output})),
            metadata(1, start, false),
        ))
    }
}
