//! Caps how much data one node is allowed to hand downstream.
//!
//! A node that returns megabytes of JSON into `RunContext` forces every
//! later reader (cache, event stream, store) to carry that weight too.
//! `DataPassingPolicy` catches this at the point the output is produced,
//! before it is recorded anywhere.

use serde::{Deserialize, Serialize};

/// What to do with an output that exceeds [`DataPassingPolicy::max_node_output_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LargeDataStrategy {
    /// Fail the node with `IceError::ResourceExceeded`.
    Reject,
    /// Spill to blob storage and pass a `NodeOutputData::BlobRef` instead.
    /// No blob store ships with the core, so choosing this strategy today
    /// has the same effect as `Reject` — it is an interface point a
    /// deployment's node executor wiring can act on, not a behavior this
    /// module implements.
    SpillToBlob,
}

/// Per-run limit on a single node's output size, checked against the
/// output's serialized JSON length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPassingPolicy {
    pub max_node_output_bytes: u64,
    pub large_data_strategy: LargeDataStrategy,
}

impl Default for DataPassingPolicy {
    fn default() -> Self {
        Self { max_node_output_bytes: 10 * 1024 * 1024, large_data_strategy: LargeDataStrategy::Reject }
    }
}

impl DataPassingPolicy {
    /// Serializes `output` and compares its length against the limit.
    /// Returns `Ok(size)` when within bounds, `Err((limit, actual))`
    /// otherwise.
    pub fn check_output_size(&self, output: &serde_json::Value) -> Result<u64, (u64, u64)> {
        let size = serde_json::to_vec(output).map(|v| v.len() as u64).unwrap_or(0);
        if size > self.max_node_output_bytes {
            Err((self.max_node_output_bytes, size))
        } else {
            Ok(size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_ten_megabytes() {
        let policy = DataPassingPolicy::default();
        assert_eq!(policy.max_node_output_bytes, 10 * 1024 * 1024);
        assert_eq!(policy.large_data_strategy, LargeDataStrategy::Reject);
    }

    #[test]
    fn output_within_limit_is_accepted() {
        let policy = DataPassingPolicy { max_node_output_bytes: 1024, ..Default::default() };
        assert!(policy.check_output_size(&serde_json::json!({"key": "value"})).is_ok());
    }

    #[test]
    fn output_past_limit_is_rejected_with_both_sizes() {
        let policy = DataPassingPolicy { max_node_output_bytes: 10, ..Default::default() };
        let result = policy.check_output_size(&serde_json::json!({"a_longer_key": "a_longer_value_that_exceeds"}));
        let (limit, actual) = result.unwrap_err();
        assert_eq!(limit, 10);
        assert!(actual > 10);
    }

    #[test]
    fn serialization_roundtrip() {
        let policy = DataPassingPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        let back: DataPassingPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_node_output_bytes, policy.max_node_output_bytes);
        assert_eq!(back.large_data_strategy, policy.large_data_strategy);
    }
}
