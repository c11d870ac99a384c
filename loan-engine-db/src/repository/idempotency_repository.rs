use async_trait::async_trait;
use loan_engine_api::domain::IdempotencyRecord;
use loan_engine_api::error::EngineResult;

/// One record per key (§3 invariant); reads return the stored response
/// verbatim until `expires_at`.
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    async fn find(&self, key: &str) -> EngineResult<Option<IdempotencyRecord>>;

    /// Fails with `EngineError::Conflict` if the key already has a record
    /// (the caller should treat that as "replay the existing one").
    async fn insert(&self, record: IdempotencyRecord) -> EngineResult<IdempotencyRecord>;
}
