use std::time::Instant;

use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{NodeExecutionResult, NodeOutputData, RunContext};
use iceos_registry::{NodeExecutor, WorkflowRuntime};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;

use crate::support::{merge_over_input, metadata, render_value};

/// Resolves `tool_name` via the registry, renders `{{ }}` placeholders in
/// `tool_args` against the run's snapshot, merges the node's resolved input
/// over the rendered args, and invokes the tool. A `Tool::call` error is
/// surfaced as a failed result rather than propagated, so its
/// retryability (carried by the `IceError` it returns) drives the node
/// executor's retry loop.
pub struct ToolExecutor;

#[async_trait]
impl NodeExecutor for ToolExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        ctx: &RunContext,
        input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Tool { tool_name, tool_args } = &node.kind else {
            return Err(IceError::internal("ToolExecutor invoked on a non-tool node"));
        };
        let tool = runtime
            .registry()
            .get_tool(tool_name)
            .ok_or_else(|| IceError::registry(format!("no tool registered for '{tool_name}'")))?;

        let rendered_args = render_value(&node.id, tool_args, &ctx.snapshot())?;
        let call_args = merge_over_input(rendered_args, &input);

        runtime.budget().register_tool_exec()?;

        let start = Instant::now();
        match tool.call(call_args).await {
            Ok(value) => Ok(NodeExecutionResult::success(NodeOutputData::inline(value), metadata(1, start, false))),
            Err(err) => Ok(NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata(1, start, false))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRuntime;
    use iceos_core::NodeId;
    use serde_json::json;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl iceos_registry::Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn call(&self, args: Value) -> Result<Value, IceError> {
            Ok(args)
        }
    }

    #[tokio::test]
    async fn merges_rendered_args_with_resolved_input() {
        let runtime = TestRuntime::new().with_tool(Arc::new(Echo));
        let ctx = RunContext::new(json!({}));
        ctx.record_output(NodeId::new("n0"), NodeOutputData::inline(json!({"city": "nyc"}))).unwrap();

        let node = NodeSpec::new(
            NodeId::new("n1"),
            vec![NodeId::new("n0")],
            NodeKind::Tool { tool_name: "echo".into(), tool_args: json!({"q": "weather in {{ n0.city }}", "units": "metric"}) },
        );

        let result = ToolExecutor.exec(&runtime, &node, &ctx, json!({"units": "imperial"})).await.unwrap();
        assert!(result.success);
        assert_eq!(
            result.output.unwrap().as_inline().unwrap(),
            &json!({"q": "weather in nyc", "units": "imperial"})
        );
    }

    #[tokio::test]
    async fn missing_tool_is_a_registry_error() {
        let runtime = TestRuntime::new();
        let ctx = RunContext::new(json!({}));
        let node = NodeSpec::new(NodeId::new("n1"), vec![], NodeKind::Tool { tool_name: "ghost".into(), tool_args: Value::Null });
        assert!(matches!(ToolExecutor.exec(&runtime, &node, &ctx, Value::Null).await, Err(IceError::RegistryError { .. })));
    }
}
