use async_trait::async_trait;
use loan_engine_api::domain::AuditEntry;
use loan_engine_api::error::EngineResult;
use uuid::Uuid;

/// Append-only; no update or delete method is exposed by design (§4.1,
/// §8: "exactly one AuditEntry with matching previous/new snapshots").
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> EngineResult<AuditEntry>;

    async fn list_by_entity(&self, entity_type: &str, entity_id: Uuid) -> EngineResult<Vec<AuditEntry>>;
}
