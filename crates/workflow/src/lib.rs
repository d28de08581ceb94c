//! The blueprint model: typed node graph, schema grammar, dependency graph,
//! validation, and topology hashing.

mod graph;
mod hash;
mod node;
mod schema;
mod validate;

pub use graph::DependencyGraph;
pub use hash::topology_hash;
pub use node::{
    BackoffStrategy, Convergence, InputMapping, NodeKind, NodeSpec, RetryPolicy, SwarmAgent,
    WaitStrategy,
};
pub use schema::SchemaDecl;
pub use validate::validate;

use std::collections::HashMap;

use iceos_core::{BlueprintId, NodeId};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable, validated DAG of nodes with metadata. Finalized blueprints
/// are never mutated in place; edits produce a new value with a bumped
/// `lock_version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: BlueprintId,
    pub schema_version: Version,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub lock_version: u64,
}

impl Blueprint {
    #[must_use]
    pub fn new(id: impl Into<BlueprintId>, schema_version: Version, nodes: Vec<NodeSpec>) -> Self {
        Self { id: id.into(), schema_version, metadata: HashMap::new(), nodes, lock_version: 0 }
    }

    #[must_use]
    pub fn find_node(&self, id: &NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Bumps the optimistic-concurrency version, used by a `BlueprintStore`
    /// implementation after a successful write.
    #[must_use]
    pub fn with_bumped_lock(mut self) -> Self {
        self.lock_version += 1;
        self
    }
}
