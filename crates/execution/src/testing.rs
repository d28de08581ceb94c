//! In-memory reference implementations of the persistence traits, used by
//! this crate's own tests and exported for downstream crates' integration
//! tests. Never a production backend.

use std::sync::Mutex;

use async_trait::async_trait;
use iceos_core::{BlueprintId, ExecutionId};
use iceos_error::IceError;
use iceos_workflow::Blueprint;
use serde_json::Value;

use crate::event::Event;
use crate::status::{Execution, ExecutionStatus};
use crate::store::{BlueprintStore, ExecutionStore, MemoryHit, MemoryStore};

#[derive(Default)]
pub struct InMemoryBlueprintStore {
    blueprints: Mutex<Vec<Blueprint>>,
}

#[async_trait]
impl BlueprintStore for InMemoryBlueprintStore {
    async fn put(&self, blueprint: &Blueprint) -> Result<(), IceError> {
        let mut store = self.blueprints.lock().unwrap();
        store.retain(|b| b.id != blueprint.id);
        store.push(blueprint.clone());
        Ok(())
    }

    async fn get(&self, id: &BlueprintId) -> Result<Option<Blueprint>, IceError> {
        Ok(self.blueprints.lock().unwrap().iter().find(|b| &b.id == id).cloned())
    }

    async fn delete(&self, id: &BlueprintId) -> Result<(), IceError> {
        self.blueprints.lock().unwrap().retain(|b| &b.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryExecutionStore {
    runs: Mutex<Vec<Execution>>,
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, run: &Execution) -> Result<(), IceError> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn update_status(&self, id: &ExecutionId, status: ExecutionStatus) -> Result<(), IceError> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs.iter_mut().find(|r| &r.id == id).ok_or_else(|| IceError::internal("unknown run"))?;
        run.status = status;
        Ok(())
    }

    async fn append_event(&self, event: &Event) -> Result<(), IceError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn read_events(&self, id: &ExecutionId, from_seq: u64) -> Result<Vec<Event>, IceError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.execution_id == id && e.seq >= from_seq)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryMemoryStore {
    entries: Mutex<Vec<(String, String, Value)>>,
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn semantic_search(&self, scope: &str, _query: &str, k: usize) -> Result<Vec<MemoryHit>, IceError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _, _)| s == scope)
            .take(k)
            .map(|(_, _, content)| MemoryHit { content: content.clone(), score: 1.0 })
            .collect())
    }

    async fn write(&self, scope: &str, key: &str, content: Value) -> Result<(), IceError> {
        self.entries.lock().unwrap().push((scope.to_owned(), key.to_owned(), content));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use semver::Version;

    #[tokio::test]
    async fn blueprint_store_put_then_get_roundtrips() {
        let store = InMemoryBlueprintStore::default();
        let bp = Blueprint::new("bp1", Version::new(1, 0, 0), vec![]);
        store.put(&bp).await.unwrap();
        let fetched = store.get(&BlueprintId::new("bp1")).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn execution_store_tracks_status_and_events() {
        let store = InMemoryExecutionStore::default();
        let run = Execution::new(BlueprintId::new("bp1"));
        store.create(&run).await.unwrap();
        store.update_status(&run.id, ExecutionStatus::Running).await.unwrap();

        let event = Event::new(run.id, 1, EventKind::RunStarted);
        store.append_event(&event).await.unwrap();

        let events = store.read_events(&run.id, 0).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn memory_store_scopes_search_results() {
        let store = InMemoryMemoryStore::default();
        store.write("org-1", "fact", Value::String("hi".into())).await.unwrap();
        store.write("org-2", "fact", Value::String("bye".into())).await.unwrap();
        let hits = store.semantic_search("org-1", "fact", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, Value::String("hi".into()));
    }
}
