use async_trait::async_trait;
use iceos_error::IceError;
use serde_json::Value;

/// A named, deterministic capability invoked by `tool` nodes and by the
/// `agent` executor's tool-calling loop.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    async fn call(&self, args: Value) -> Result<Value, IceError>;
}
