use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::Usage;
use serde_json::Value;

/// The result of one completion call: response payload, token usage, and
/// cost computed from the provider's rate table.
#[derive(Debug, Clone)]
pub struct LlmCompletion {
    pub text: Value,
    pub usage: Usage,
    pub cost_usd: f64,
}

/// A named LLM provider, resolved by `model` from an `llm` node.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model(&self) -> &str;
    async fn complete(&self, prompt: &str, config: &Value) -> Result<LlmCompletion, IceError>;
}
