use std::collections::HashMap;

use iceos_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::SchemaDecl;

/// A single node in a blueprint. Common fields live at the top level; the
/// per-type fields from the node type table are folded in via
/// `#[serde(flatten)]` so the wire format matches a flat `{type: "tool", ...}`
/// object rather than a nested envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<NodeId>,
    pub input_schema: Option<SchemaDecl>,
    pub output_schema: Option<SchemaDecl>,
    #[serde(default)]
    pub input_mappings: HashMap<String, InputMapping>,
    pub retry_policy: Option<RetryPolicy>,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub use_cache: bool,
    pub provider: Option<String>,
    /// Marks the node as forbidding any sibling from requiring external I/O.
    #[serde(default)]
    pub airgap: bool,
    /// Marks the node as needing network/filesystem access beyond the
    /// sandbox's default capability set.
    #[serde(default)]
    pub requires_external_io: bool,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl NodeSpec {
    #[must_use]
    pub fn new(id: NodeId, dependencies: Vec<NodeId>, kind: NodeKind) -> Self {
        Self {
            id,
            name: None,
            dependencies,
            input_schema: None,
            output_schema: None,
            input_mappings: HashMap::new(),
            retry_policy: None,
            timeout_ms: None,
            use_cache: false,
            provider: None,
            airgap: false,
            requires_external_io: false,
            kind,
        }
    }

    #[must_use]
    pub fn node_type(&self) -> &'static str {
        self.kind.node_type()
    }
}

/// Per-type node payload, discriminated by the flattened `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Tool { tool_name: String, tool_args: Value },
    Llm {
        model: String,
        prompt: String,
        #[serde(default)]
        llm_config: Value,
        #[serde(default)]
        memory_aware: bool,
        response_format: Option<String>,
    },
    Agent {
        package: String,
        tools: Vec<String>,
        max_iterations: u32,
        memory_config: Option<Value>,
    },
    Condition {
        expression: String,
        #[serde(default)]
        true_path: Vec<NodeSpec>,
        #[serde(default)]
        false_path: Vec<NodeSpec>,
    },
    Loop {
        items_source: String,
        item_var: String,
        body: Vec<NodeSpec>,
        max_iterations: u32,
    },
    Parallel {
        branches: Vec<Vec<NodeSpec>>,
        wait_strategy: WaitStrategy,
    },
    Code {
        code: String,
        #[serde(default = "default_code_language")]
        language: String,
        imports: Option<Vec<String>>,
    },
    Recursive {
        agent_package: String,
        partner_node_id: NodeId,
        convergence: Convergence,
    },
    Workflow { workflow_ref: String },
    Human { prompt_for_approval: String, timeout_ms: u64 },
    Swarm { agents: Vec<SwarmAgent>, coordination_strategy: String },
}

fn default_code_language() -> String {
    "python-wasm".to_owned()
}

impl NodeKind {
    #[must_use]
    pub fn node_type(&self) -> &'static str {
        match self {
            Self::Tool { .. } => "tool",
            Self::Llm { .. } => "llm",
            Self::Agent { .. } => "agent",
            Self::Condition { .. } => "condition",
            Self::Loop { .. } => "loop",
            Self::Parallel { .. } => "parallel",
            Self::Code { .. } => "code",
            Self::Recursive { .. } => "recursive",
            Self::Workflow { .. } => "workflow",
            Self::Human { .. } => "human",
            Self::Swarm { .. } => "swarm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_strategy: BackoffStrategy,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> u64 {
        match self.backoff_strategy {
            BackoffStrategy::Fixed => self.backoff_ms,
            BackoffStrategy::Exponential => self.backoff_ms.saturating_mul(1u64 << attempt.min(16)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputMapping {
    Literal(Value),
    FromNode { source_node_id: NodeId, source_output_key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WaitStrategy {
    All,
    Any,
    NOfM { n: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Convergence {
    pub max_iterations: u32,
    pub stop_predicate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmAgent {
    pub role: String,
    pub package: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_matches_kind() {
        let node = NodeSpec::new(
            NodeId::new("n1"),
            vec![],
            NodeKind::Tool { tool_name: "echo".into(), tool_args: Value::Null },
        );
        assert_eq!(node.node_type(), "tool");
    }

    #[test]
    fn retry_policy_exponential_backoff_doubles() {
        let policy = RetryPolicy { max_attempts: 3, backoff_strategy: BackoffStrategy::Exponential, backoff_ms: 100 };
        assert_eq!(policy.backoff_for_attempt(0), 100);
        assert_eq!(policy.backoff_for_attempt(1), 200);
        assert_eq!(policy.backoff_for_attempt(2), 400);
    }

    #[test]
    fn retry_policy_fixed_backoff_is_constant() {
        let policy = RetryPolicy { max_attempts: 3, backoff_strategy: BackoffStrategy::Fixed, backoff_ms: 50 };
        assert_eq!(policy.backoff_for_attempt(0), 50);
        assert_eq!(policy.backoff_for_attempt(5), 50);
    }

    #[test]
    fn serde_roundtrip_tool_node() {
        let node = NodeSpec::new(
            NodeId::new("n1"),
            vec![NodeId::new("n0")],
            NodeKind::Tool { tool_name: "echo".into(), tool_args: serde_json::json!({"msg": "hi"}) },
        );
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"type\":\"tool\""));
        let back: NodeSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, node.id);
        assert_eq!(back.node_type(), "tool");
    }
}
