use async_trait::async_trait;
use loan_engine_api::domain::Notification;
use loan_engine_api::error::EngineResult;
use uuid::Uuid;

/// Indexed by `(account_id, created_at desc)` and `(account_id, read_at is
/// null)` per §3.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> EngineResult<Notification>;

    async fn find_by_id(&self, id: Uuid) -> EngineResult<Option<Notification>>;

    async fn list_by_account(&self, account_id: Uuid, limit: usize, offset: usize) -> EngineResult<Vec<Notification>>;

    async fn unread_count(&self, account_id: Uuid) -> EngineResult<u64>;

    async fn mark_read(&self, id: Uuid, read_at: chrono::DateTime<chrono::Utc>) -> EngineResult<Notification>;

    async fn mark_all_read(&self, account_id: Uuid, read_at: chrono::DateTime<chrono::Utc>) -> EngineResult<u64>;
}
