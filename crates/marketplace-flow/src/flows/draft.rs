use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::domain::{CompletedEntity, EntityId, EntityRecord, FlowKind};
use super::gateway::{GatewayError, PersistenceGateway};

/// Simple string key-value store used for best-effort local drafts.
pub trait DraftStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), DraftError>;
    fn remove(&self, key: &str) -> Result<(), DraftError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("draft store unavailable: {0}")]
    Unavailable(String),
    #[error("draft could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Keys a kind's draft lives under: `"<stem>Card"` and `"has<Stem>Card"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftKeys {
    pub card: String,
    pub flag: String,
}

impl DraftKeys {
    pub fn for_kind(kind: FlowKind) -> Self {
        let stem = kind.draft_stem();
        let mut capitalized = String::with_capacity(stem.len());
        let mut chars = stem.chars();
        if let Some(first) = chars.next() {
            capitalized.extend(first.to_uppercase());
            capitalized.push_str(chars.as_str());
        }
        Self {
            card: format!("{stem}Card"),
            flag: format!("has{capitalized}Card"),
        }
    }
}

/// Mirrors persisted entities into a [`DraftStore`]. Never authoritative:
/// write failures are logged and swallowed, unreadable drafts read as absent.
pub struct DraftMirror<S> {
    store: Arc<S>,
}

impl<S> Clone for DraftMirror<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> DraftMirror<S>
where
    S: DraftStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn mirror(&self, record: &EntityRecord) {
        if let Err(err) = self.try_mirror(record) {
            warn!(kind = ?record.kind, error = %err, "draft mirror write failed");
        }
    }

    fn try_mirror(&self, record: &EntityRecord) -> Result<(), DraftError> {
        let keys = DraftKeys::for_kind(record.kind);
        let encoded = serde_json::to_string(record)?;
        self.store.set(&keys.card, encoded)?;
        self.store.set(&keys.flag, "true".to_string())
    }

    pub fn restore(&self, kind: FlowKind) -> Option<EntityRecord> {
        let keys = DraftKeys::for_kind(kind);
        if self.store.get(&keys.flag).as_deref() != Some("true") {
            return None;
        }
        let raw = self.store.get(&keys.card)?;
        match serde_json::from_str::<EntityRecord>(&raw) {
            Ok(record) if record.kind == kind => Some(record),
            Ok(record) => {
                warn!(expected = ?kind, found = ?record.kind, "draft holds another kind");
                None
            }
            Err(err) => {
                warn!(kind = ?kind, error = %err, "stale draft could not be decoded");
                None
            }
        }
    }

    pub fn clear(&self, kind: FlowKind) {
        let keys = DraftKeys::for_kind(kind);
        for key in [&keys.card, &keys.flag] {
            if let Err(err) = self.store.remove(key) {
                warn!(key = %key, error = %err, "draft clear failed");
            }
        }
    }
}

/// Gateway decorator that mirrors every successful save into the draft store.
pub struct MirroredGateway<G, S> {
    inner: Arc<G>,
    mirror: Option<DraftMirror<S>>,
}

impl<G, S> MirroredGateway<G, S>
where
    G: PersistenceGateway,
    S: DraftStore,
{
    pub fn new(inner: Arc<G>, mirror: Option<DraftMirror<S>>) -> Self {
        Self { inner, mirror }
    }

    pub fn mirror(&self) -> Option<&DraftMirror<S>> {
        self.mirror.as_ref()
    }
}

#[async_trait]
impl<G, S> PersistenceGateway for MirroredGateway<G, S>
where
    G: PersistenceGateway + 'static,
    S: DraftStore + 'static,
{
    async fn save(&self, entity: &CompletedEntity) -> Result<EntityRecord, GatewayError> {
        let record = self.inner.save(entity).await?;
        if let Some(mirror) = &self.mirror {
            mirror.mirror(&record);
        }
        Ok(record)
    }

    async fn load(&self, kind: FlowKind, id: &EntityId) -> Result<EntityRecord, GatewayError> {
        self.inner.load(kind, id).await
    }
}
