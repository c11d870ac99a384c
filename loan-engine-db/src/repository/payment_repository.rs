use async_trait::async_trait;
use loan_engine_api::domain::Payment;
use loan_engine_api::error::EngineResult;
use uuid::Uuid;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Fails with `EngineError::Conflict` on `idempotency_key` or
    /// `reference` collision (§4.1 uniqueness constraints).
    async fn insert(&self, payment: Payment) -> EngineResult<Payment>;

    async fn find_by_id(&self, payment_id: Uuid) -> EngineResult<Option<Payment>>;

    async fn find_by_idempotency_key(&self, key: &str) -> EngineResult<Option<Payment>>;

    async fn list_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Payment>>;

    async fn list_by_account(&self, account_id: Uuid) -> EngineResult<Vec<Payment>>;

    async fn update_cas(&self, payment: Payment) -> EngineResult<Payment>;
}
