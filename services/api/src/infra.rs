use async_trait::async_trait;
use chrono::Utc;
use marketplace_flow::flows::{
    CompletedEntity, DraftError, DraftStore, EntityId, EntityRecord, FlowKind, GatewayError,
    PersistenceGateway,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local system of record for entities produced by flows.
#[derive(Default)]
pub(crate) struct InMemoryEntityStore {
    records: Mutex<HashMap<EntityId, EntityRecord>>,
    sequence: AtomicU64,
}

impl InMemoryEntityStore {
    fn next_id(&self, kind: FlowKind) -> EntityId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        EntityId(format!("{}-{id:06}", kind.draft_stem()))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryEntityStore {
    async fn save(&self, entity: &CompletedEntity) -> Result<EntityRecord, GatewayError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| GatewayError::Unavailable("entity store poisoned".to_string()))?;

        let id = match entity.id() {
            Some(id) => {
                let existing = guard
                    .get(id)
                    .ok_or_else(|| GatewayError::NotFound(id.clone()))?;
                if existing.kind != entity.kind() {
                    return Err(GatewayError::Rejected(format!(
                        "{} is a {}, not a {}",
                        id,
                        existing.kind.label(),
                        entity.kind().label()
                    )));
                }
                id.clone()
            }
            None => self.next_id(entity.kind()),
        };

        let record = EntityRecord {
            id: id.clone(),
            kind: entity.kind(),
            fields: entity.fields().clone(),
            updated_at: Utc::now(),
        };
        guard.insert(id, record.clone());
        Ok(record)
    }

    async fn load(&self, kind: FlowKind, id: &EntityId) -> Result<EntityRecord, GatewayError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| GatewayError::Unavailable("entity store poisoned".to_string()))?;
        guard
            .get(id)
            .filter(|record| record.kind == kind)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }
}

/// Draft key-value store kept alongside the entity store.
#[derive(Default)]
pub(crate) struct InMemoryDraftStore {
    entries: Mutex<HashMap<String, String>>,
}

impl DraftStore for InMemoryDraftStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), DraftError> {
        self.entries
            .lock()
            .map_err(|_| DraftError::Unavailable("draft store poisoned".to_string()))?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftError> {
        self.entries
            .lock()
            .map_err(|_| DraftError::Unavailable("draft store poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}
