use async_trait::async_trait;

use super::domain::{CompletedEntity, EntityId, EntityRecord, FlowKind};

/// System of record the flow hands finished entities to.
///
/// `save` is the only suspension point of a flow; implementations decide
/// whether that means a network call, a database write or a local store.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Persist a completed entity. Creates when `entity.id()` is `None`,
    /// updates otherwise.
    async fn save(&self, entity: &CompletedEntity) -> Result<EntityRecord, GatewayError>;

    /// Fetch an existing entity to open an edit flow over it.
    async fn load(&self, kind: FlowKind, id: &EntityId) -> Result<EntityRecord, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("entity {0} not found")]
    NotFound(EntityId),
    #[error("entity rejected: {0}")]
    Rejected(String),
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}
