use async_trait::async_trait;
use loan_engine_api::domain::Account;
use loan_engine_api::error::EngineResult;
use uuid::Uuid;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, account_id: Uuid) -> EngineResult<Option<Account>>;

    /// Resolved at notification-send time for operator fan-out (§4.6).
    async fn list_operators(&self) -> EngineResult<Vec<Account>>;

    async fn update_cas(&self, account: Account) -> EngineResult<Account>;
}
