use iceos_core::NodeId;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Computes the node-level cache key: `sha256(topology_hash | node_id |
/// canonical(input))`. `input` is canonicalized by serializing its
/// `serde_json::Value` form, which sorts object keys deterministically.
#[must_use]
pub fn cache_key(topology_hash: &str, node_id: &NodeId, input: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(topology_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(node_id.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(canonical(input).as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.as_str());
            let body: Vec<String> = entries.iter().map(|(k, v)| format!("\"{k}\":{}", canonical(v))).collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}
