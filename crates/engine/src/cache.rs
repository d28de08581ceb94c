use dashmap::DashMap;
use iceos_execution::NodeExecutionResult;

/// Per-run node result cache keyed by [`iceos_execution::cache_key`]. Only
/// successful results are cached — a cache hit for a failed attempt would
/// just make the node "succeed" at retrying the same failure for free.
pub struct NodeCache {
    entries: DashMap<String, NodeExecutionResult>,
}

impl NodeCache {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<NodeExecutionResult> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    pub fn put(&self, key: String, result: NodeExecutionResult) {
        if result.success {
            self.entries.insert(key, result);
        }
    }
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iceos_execution::{NodeMetadata, NodeOutputData};
    use serde_json::json;

    fn ok() -> NodeExecutionResult {
        NodeExecutionResult::success(NodeOutputData::inline(json!(1)), NodeMetadata { attempt: 1, duration_ms: 0, cache_hit: false })
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = NodeCache::new();
        cache.put("k".to_owned(), ok());
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn a_failed_result_is_never_cached() {
        let cache = NodeCache::new();
        let failure = NodeExecutionResult::failure("boom", "transient", NodeMetadata { attempt: 1, duration_ms: 0, cache_hit: false });
        cache.put("k".to_owned(), failure);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn missing_key_is_none() {
        let cache = NodeCache::new();
        assert!(cache.get("ghost").is_none());
    }
}
