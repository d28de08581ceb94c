use dashmap::DashMap;
use iceos_core::{NodeId, OrgId, SessionId, UserId};
use iceos_error::IceError;
use serde_json::Value;

use crate::output::NodeOutputData;

/// Per-run shared state. The scheduler exclusively owns writes; executors
/// read a stable snapshot through [`RunContext::snapshot`]. A node's output
/// is written at most once — [`RunContext::record_output`] fails if the slot
/// is already occupied, enforcing the "written exactly once" invariant at
/// the type level rather than by convention.
#[derive(Debug)]
pub struct RunContext {
    pub inputs: Value,
    pub org_id: Option<OrgId>,
    pub user_id: Option<UserId>,
    pub session_id: Option<SessionId>,
    outputs: DashMap<NodeId, NodeOutputData>,
}

impl RunContext {
    #[must_use]
    pub fn new(inputs: Value) -> Self {
        Self { inputs, org_id: None, user_id: None, session_id: None, outputs: DashMap::new() }
    }

    #[must_use]
    pub fn with_identity(mut self, org_id: Option<OrgId>, user_id: Option<UserId>, session_id: Option<SessionId>) -> Self {
        self.org_id = org_id;
        self.user_id = user_id;
        self.session_id = session_id;
        self
    }

    /// Writes a node's output. Fails with `IceError::Internal` if the node
    /// already has a recorded output — outputs are append-only.
    pub fn record_output(&self, node_id: NodeId, output: NodeOutputData) -> Result<(), IceError> {
        if self.outputs.contains_key(&node_id) {
            return Err(IceError::internal(format!("node '{node_id}' output was already recorded")));
        }
        self.outputs.insert(node_id, output);
        Ok(())
    }

    #[must_use]
    pub fn output_of(&self, node_id: &NodeId) -> Option<NodeOutputData> {
        self.outputs.get(node_id).map(|entry| entry.clone())
    }

    #[must_use]
    pub fn has_output(&self, node_id: &NodeId) -> bool {
        self.outputs.contains_key(node_id)
    }

    /// Resolves a dotted path against a node's inline output, per the
    /// `input_mappings` resolution rule. `"."` or an empty path means the
    /// whole output.
    pub fn resolve_path(&self, node_id: &NodeId, path: &str) -> Result<Value, IceError> {
        let output = self
            .output_of(node_id)
            .ok_or_else(|| IceError::input_unresolved(node_id.to_string(), "producer has no output"))?;
        let Some(value) = output.as_inline() else {
            return Err(IceError::input_unresolved(node_id.to_string(), "output is a blob reference"));
        };
        if path.is_empty() || path == "." {
            return Ok(value.clone());
        }
        let mut current = value;
        for segment in path.split('.') {
            current = current.get(segment).ok_or_else(|| {
                IceError::input_unresolved(node_id.to_string(), format!("path '{path}' does not resolve"))
            })?;
        }
        Ok(current.clone())
    }

    /// A flat snapshot of every recorded output, keyed by node id string, for
    /// template rendering and condition evaluation contexts.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let mut map = serde_json::Map::new();
        for entry in self.outputs.iter() {
            if let Some(value) = entry.value().as_inline() {
                map.insert(entry.key().to_string(), value.clone());
            }
        }
        map.insert("inputs".to_owned(), self.inputs.clone());
        Value::Object(map)
    }
}
