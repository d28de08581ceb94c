use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{NodeExecutionResult, NodeOutputData, RunContext};
use iceos_registry::{AgentStep, NodeExecutor, WorkflowRuntime};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;

use crate::support::metadata;

/// Resolves `package` via the registry, instantiates an agent scoped to the
/// node's `tools` subset, and iterates `step` until a `FinalAnswer`,
/// `max_iterations`, or a tool-call failure stops the loop.
pub struct AgentExecutor;

#[async_trait]
impl NodeExecutor for AgentExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        _ctx: &RunContext,
        input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Agent { package, tools, max_iterations, .. } = &node.kind else {
            return Err(IceError::internal("AgentExecutor invoked on a non-agent node"));
        };
        let factory = runtime.registry().get_agent(package).ok_or_else(|| IceError::registry(format!("no agent registered for '{package}'")))?;

        let mut by_name = HashMap::with_capacity(tools.len());
        let mut resolved = Vec::with_capacity(tools.len());
        for name in tools {
            let tool = runtime.registry().get_tool(name).ok_or_else(|| IceError::registry(format!("no tool registered for '{name}'")))?;
            by_name.insert(name.clone(), tool.clone());
            resolved.push(tool);
        }
        let agent = factory.create(resolved);

        let mut transcript = serde_json::json!({"input": input, "steps": []});
        let start = Instant::now();

        for _ in 0..*max_iterations {
            let step = agent.step(&transcript).await?;
            match step {
                AgentStep::FinalAnswer(answer) => {
                    return Ok(NodeExecutionResult::success(
                        NodeOutputData::inline(serde_json::json!({"final_answer": answer, "transcript": transcript})),
                        metadata(1, start, false),
                    ));
                }
                AgentStep::ToolCall { tool_name, args } => {
                    let Some(tool) = by_name.get(&tool_name) else {
                        return Ok(NodeExecutionResult::failure(
                            format!("agent called undeclared tool '{tool_name}'"),
                            "validation_error",
                            metadata(1, start, false),
                        ));
                    };
                    runtime.budget().register_tool_exec()?;
                    match tool.call(args.clone()).await {
                        Ok(observation) => push_step(&mut transcript, &tool_name, &args, &observation),
                        Err(err) => return Ok(NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata(1, start, false))),
                    }
                }
            }
        }

        Ok(NodeExecutionResult::failure(
            "agent exceeded max_iterations without a final answer",
            "resource_exceeded",
            metadata(1, start, false),
        ))
    }
}

fn push_step(transcript: &mut Value, tool_name: &str, args: &Value, observation: &Value) {
    if let Some(steps) = transcript.get_mut("steps").and_then(Value::as_array_mut) {
        steps.push(serde_json::json!({"tool": tool_name, "args": args, "observation": observation}));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRuntime;
    use iceos_core::NodeId;
    use iceos_registry::{Agent, AgentFactory, Tool};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    struct Calculator;

    #[async_trait]
    impl Tool for Calculator {
        fn name(&self) -> &str {
            "calculator"
        }

        async fn call(&self, args: Value) -> Result<Value, IceError> {
            Ok(json!({"sum": args["a"].as_i64().unwrap_or(0) + args["b"].as_i64().unwrap_or(0)}))
        }
    }

    struct ScriptedAgent {
        steps: Mutex<Vec<AgentStep>>,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        async fn step(&self, _transcript: &Value) -> Result<AgentStep, IceError> {
            let mut steps = self.steps.lock();
            Ok(if steps.is_empty() { AgentStep::FinalAnswer(json!("done")) } else { steps.remove(0) })
        }
    }

    struct ScriptedFactory(Vec<AgentStep>);

    impl AgentFactory for ScriptedFactory {
        fn package(&self) -> &str {
            "scripted"
        }

        fn create(&self, _tools: Vec<Arc<dyn Tool>>) -> Arc<dyn Agent> {
            Arc::new(ScriptedAgent { steps: Mutex::new(self.0.clone()) })
        }
    }

    fn node() -> NodeSpec {
        NodeSpec::new(
            NodeId::new("n1"),
            vec![],
            NodeKind::Agent { package: "scripted".into(), tools: vec!["calculator".into()], max_iterations: 5, memory_config: None },
        )
    }

    #[tokio::test]
    async fn calls_a_tool_then_returns_final_answer() {
        let steps = vec![AgentStep::ToolCall { tool_name: "calculator".into(), args: json!({"a": 2, "b": 3}) }];
        let runtime = TestRuntime::new().with_tool(Arc::new(Calculator)).with_agent(Arc::new(ScriptedFactory(steps)));
        let ctx = RunContext::new(json!({}));
        let result = AgentExecutor.exec(&runtime, &node(), &ctx, Value::Null).await.unwrap();
        assert!(result.success);
        let output = result.output.unwrap();
        assert_eq!(output.as_inline().unwrap()["final_answer"], json!("done"));
    }

    #[tokio::test]
    async fn undeclared_tool_call_fails_without_invoking_anything() {
        let steps = vec![AgentStep::ToolCall { tool_name: "shell".into(), args: Value::Null }];
        let runtime = TestRuntime::new().with_agent(Arc::new(ScriptedFactory(steps)));
        let ctx = RunContext::new(json!({}));
        let result = AgentExecutor.exec(&runtime, &node(), &ctx, Value::Null).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_type.as_deref(), Some("validation_error"));
    }

    #[tokio::test]
    async fn exhausting_max_iterations_without_final_answer_fails() {
        let steps = vec![AgentStep::ToolCall { tool_name: "calculator".into(), args: json!({"a": 1, "b": 1}) }; 10];
        let runtime = TestRuntime::new().with_tool(Arc::new(Calculator)).with_agent(Arc::new(ScriptedFactory(steps)));
        let ctx = RunContext::new(json!({}));
        let mut spec = node();
        let NodeKind::Agent { max_iterations, .. } = &mut spec.kind else { unreachable!() };
        *max_iterations = 2;
        let result = AgentExecutor.exec(&runtime, &spec, &ctx, Value::Null).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_type.as_deref(), Some("resource_exceeded"));
    }
}
