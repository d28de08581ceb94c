use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node's output, either carried inline or spilled to blob storage when it
/// exceeds the data-passing policy's size limit. The blob-ref variant is an
/// interface point: no blob store ships with the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeOutputData {
    Inline(Value),
    BlobRef { key: String, size: u64, mime: String },
}

impl NodeOutputData {
    #[must_use]
    pub fn inline(value: Value) -> Self {
        Self::Inline(value)
    }

    #[must_use]
    pub fn blob(key: impl Into<String>, size: u64, mime: impl Into<String>) -> Self {
        Self::BlobRef { key: key.into(), size, mime: mime.into() }
    }

    #[must_use]
    pub fn as_inline(&self) -> Option<&Value> {
        match self {
            Self::Inline(v) => Some(v),
            Self::BlobRef { .. } => None,
        }
    }

    #[must_use]
    pub fn is_blob_ref(&self) -> bool {
        matches!(self, Self::BlobRef { .. })
    }
}

/// Token/cost accounting for an `llm` node invocation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Metadata recorded alongside every node attempt, independent of success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub attempt: u32,
    pub duration_ms: u64,
    pub cache_hit: bool,
}

/// The result of one node executor invocation. Created per attempt; only
/// the final attempt's result is persisted into the run context and event
/// stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionResult {
    pub success: bool,
    pub output: Option<NodeOutputData>,
    pub error: Option<String>,
    pub error_type: Option<String>,
    pub metadata: NodeMetadata,
    pub usage: Option<Usage>,
    pub cost_usd: Option<f64>,
}

impl NodeExecutionResult {
    #[must_use]
    pub fn success(output: NodeOutputData, metadata: NodeMetadata) -> Self {
        Self { success: true, output: Some(output), error: None, error_type: None, metadata, usage: None, cost_usd: None }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>, error_type: impl Into<String>, metadata: NodeMetadata) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            error_type: Some(error_type.into()),
            metadata,
            usage: None,
            cost_usd: None,
        }
    }

    #[must_use]
    pub fn with_usage(mut self, usage: Usage, cost_usd: f64) -> Self {
        self.usage = Some(usage);
        self.cost_usd = Some(cost_usd);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inline_output_exposes_value() {
        let output = NodeOutputData::inline(json!({"x": 1}));
        assert_eq!(output.as_inline(), Some(&json!({"x": 1})));
        assert!(!output.is_blob_ref());
    }

    #[test]
    fn blob_ref_has_no_inline_value() {
        let output = NodeOutputData::blob("s3://x", 2048, "application/json");
        assert!(output.as_inline().is_none());
        assert!(output.is_blob_ref());
    }

    #[test]
    fn success_result_carries_output_and_no_error() {
        let metadata = NodeMetadata { attempt: 1, duration_ms: 5, cache_hit: false };
        let result = NodeExecutionResult::success(NodeOutputData::inline(json!(1)), metadata);
        assert!(result.success);
        assert!(result.error.is_none());
    }

    #[test]
    fn failure_result_carries_error_type() {
        let metadata = NodeMetadata { attempt: 2, duration_ms: 5, cache_hit: false };
        let result = NodeExecutionResult::failure("boom", "transient", metadata);
        assert!(!result.success);
        assert_eq!(result.error_type.as_deref(), Some("transient"));
    }
}
