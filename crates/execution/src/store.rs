use async_trait::async_trait;
use iceos_core::{BlueprintId, ExecutionId};
use iceos_error::IceError;
use iceos_workflow::Blueprint;
use serde_json::Value;

use crate::event::Event;
use crate::status::{Execution, ExecutionStatus};

/// Durable blueprint storage with optimistic concurrency via `lock_version`.
/// Consumed, not implemented here — the runtime only depends on this trait.
#[async_trait]
pub trait BlueprintStore: Send + Sync {
    async fn put(&self, blueprint: &Blueprint) -> Result<(), IceError>;
    async fn get(&self, id: &BlueprintId) -> Result<Option<Blueprint>, IceError>;
    async fn delete(&self, id: &BlueprintId) -> Result<(), IceError>;
}

/// Durable execution record + event-stream storage. `append_event` must be
/// ack'd before the scheduler treats a node as `NodeSucceeded`, per the
/// durability requirement that subscribers never observe a "completed" node
/// without its event.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create(&self, run: &Execution) -> Result<(), IceError>;
    async fn update_status(&self, id: &ExecutionId, status: ExecutionStatus) -> Result<(), IceError>;
    async fn append_event(&self, event: &Event) -> Result<(), IceError>;
    async fn read_events(&self, id: &ExecutionId, from_seq: u64) -> Result<Vec<Event>, IceError>;
}

/// A single semantic memory search hit.
#[derive(Debug, Clone)]
pub struct MemoryHit {
    pub content: Value,
    pub score: f32,
}

/// Scoped semantic memory, consumed by the `agent`/`llm` executors when
/// `memory_aware` is set. Not implemented here.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn semantic_search(&self, scope: &str, query: &str, k: usize) -> Result<Vec<MemoryHit>, IceError>;
    async fn write(&self, scope: &str, key: &str, content: Value) -> Result<(), IceError>;
}
