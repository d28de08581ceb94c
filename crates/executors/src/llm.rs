use std::time::Instant;

use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{NodeExecutionResult, NodeOutputData, RunContext};
use iceos_expression::render_template;
use iceos_registry::{NodeExecutor, WorkflowRuntime};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;

use crate::support::metadata;

/// Resolves `model` via the registry, renders the `prompt` template against
/// the run's snapshot (optionally prefixed with `memory_aware` retrieval
/// hits), enforces `response_format`, and records usage/cost against the
/// budget.
pub struct LlmExecutor;

#[async_trait]
impl NodeExecutor for LlmExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        ctx: &RunContext,
        _input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Llm { model, prompt, llm_config, memory_aware, response_format } = &node.kind else {
            return Err(IceError::internal("LlmExecutor invoked on a non-llm node"));
        };
        let provider = runtime.registry().get_llm(model).ok_or_else(|| IceError::registry(format!("no llm provider registered for '{model}'")))?;

        let mut context = ctx.snapshot();
        if *memory_aware {
            if let Some(memory) = runtime.memory() {
                let scope = ctx
                    .session_id
                    .as_ref()
                    .map(ToString::to_string)
                    .or_else(|| ctx.org_id.as_ref().map(ToString::to_string))
                    .unwrap_or_default();
                let hits = memory.semantic_search(&scope, prompt, 5).await?;
                if let Value::Object(map) = &mut context {
                    map.insert("memory".to_owned(), Value::Array(hits.into_iter().map(|hit| hit.content).collect()));
                }
            }
        }

        let rendered_prompt = render_template(prompt, &context).map_err(|err| IceError::input_unresolved(node.id.to_string(), err.to_string()))?;

        runtime.budget().reserve_llm_call()?;
        let start = Instant::now();
        let outcome = provider.complete(&rendered_prompt, llm_config).await;

        match outcome {
            Ok(completion) => {
                if response_format.as_deref() == Some("json_mode") && !completion.text.is_object() && !completion.text.is_array() {
                    return Ok(NodeExecutionResult::failure(
                        "response_format json_mode requires a JSON object or array response",
                        "output_schema_error",
                        metadata(1, start, false),
                    ));
                }
                runtime.budget().record_llm_cost(completion.cost_usd)?;
                Ok(NodeExecutionResult::success(NodeOutputData::inline(completion.text), metadata(1, start, false))
                    .with_usage(completion.usage, completion.cost_usd))
            }
            Err(err) => Ok(NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata(1, start, false))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRuntime;
    use iceos_core::NodeId;
    use iceos_execution::Usage;
    use iceos_registry::LlmCompletion;
    use serde_json::json;
    use std::sync::Arc;

    struct StaticLlm(&'static str);

    #[async_trait]
    impl iceos_registry::LlmProvider for StaticLlm {
        fn model(&self) -> &str {
            self.0
        }

        async fn complete(&self, prompt: &str, _config: &Value) -> Result<LlmCompletion, IceError> {
            Ok(LlmCompletion { text: json!(format!("reply to: {prompt}")), usage: Usage::default(), cost_usd: 0.002 })
        }
    }

    fn node(prompt: &str, response_format: Option<&str>) -> NodeSpec {
        NodeSpec::new(
            NodeId::new("n1"),
            vec![],
            NodeKind::Llm {
                model: "gpt".into(),
                prompt: prompt.into(),
                llm_config: Value::Null,
                memory_aware: false,
                response_format: response_format.map(str::to_owned),
            },
        )
    }

    #[tokio::test]
    async fn renders_prompt_and_records_usage() {
        let runtime = TestRuntime::new().with_llm(Arc::new(StaticLlm("gpt")));
        let ctx = RunContext::new(json!({"name": "ada"}));
        let result = LlmExecutor.exec(&runtime, &node("hello {{ inputs.name }}", None), &ctx, Value::Null).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output.unwrap().as_inline().unwrap(), &json!("reply to: hello ada"));
        assert!(result.cost_usd.is_some());
    }

    #[tokio::test]
    async fn second_call_blocked_once_llm_call_budget_exhausted() {
        use iceos_execution::BudgetLimits;

        let runtime = TestRuntime::new()
            .with_llm(Arc::new(StaticLlm("gpt")))
            .with_budget(BudgetLimits { max_llm_calls: Some(1), ..Default::default() });
        let ctx = RunContext::new(json!({}));
        let spec = node("hi", None);
        LlmExecutor.exec(&runtime, &spec, &ctx, Value::Null).await.unwrap();
        assert!(matches!(LlmExecutor.exec(&runtime, &spec, &ctx, Value::Null).await, Err(IceError::BudgetExceeded { .. })));
    }

    #[tokio::test]
    async fn json_mode_rejects_a_plain_string_reply() {
        let runtime = TestRuntime::new().with_llm(Arc::new(StaticLlm("gpt")));
        let ctx = RunContext::new(json!({}));
        let result = LlmExecutor.exec(&runtime, &node("hi", Some("json_mode")), &ctx, Value::Null).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_type.as_deref(), Some("output_schema_error"));
    }
}
