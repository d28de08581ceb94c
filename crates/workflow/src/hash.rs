use sha2::{Digest, Sha256};

use crate::graph::DependencyGraph;
use crate::Blueprint;

/// A deterministic fingerprint of a blueprint's adjacency, used as the cache
/// key prefix for node-level result caching. SHA-256 over the
/// lexicographically sorted adjacency list, hex-encoded.
pub fn topology_hash(blueprint: &Blueprint) -> Result<String, iceos_error::IceError> {
    let graph = DependencyGraph::from_blueprint(blueprint)?;
    let mut entries: Vec<(String, Vec<String>)> = blueprint
        .nodes
        .iter()
        .map(|n| {
            let mut deps: Vec<String> = graph.predecessors(&n.id).into_iter().map(|d| d.to_string()).collect();
            deps.sort();
            (n.id.to_string(), deps)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (id, deps) in entries {
        hasher.update(id.as_bytes());
        hasher.update(b"|");
        hasher.update(deps.join(",").as_bytes());
        hasher.update(b";");
    }

    Ok(hex::encode(hasher.finalize()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}
