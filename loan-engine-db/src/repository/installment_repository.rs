use async_trait::async_trait;
use loan_engine_api::domain::Installment;
use loan_engine_api::error::EngineResult;
use uuid::Uuid;

#[async_trait]
pub trait InstallmentRepository: Send + Sync {
    /// Create the full amortization schedule atomically, all rows
    /// `status = pending`, `paid_amount = 0` (§4.3).
    async fn insert_schedule(&self, installments: Vec<Installment>) -> EngineResult<Vec<Installment>>;

    /// Ordered ascending by `installment_number`.
    async fn find_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Installment>>;

    /// `{pending, partial, overdue}` ordered ascending by
    /// `installment_number` — the FIFO allocation order (§4.4 step 4).
    async fn find_outstanding_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Installment>>;

    /// Conditional update keyed by `(loan_id, installment_number)` plus
    /// `version` (§5).
    async fn update_cas(&self, installment: Installment) -> EngineResult<Installment>;
}
