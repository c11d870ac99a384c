use async_trait::async_trait;
use loan_engine_api::domain::Loan;
use loan_engine_api::error::EngineResult;
use uuid::Uuid;

/// Durable access to `Loan` rows, gated by the version compare-and-set
/// discipline described in spec §4.1: `update_cas` succeeds only if the
/// persisted version equals `expected_version`, and increments it
/// atomically with the field changes. A mismatch is
/// `EngineError::Concurrency`.
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn insert(&self, loan: Loan) -> EngineResult<Loan>;

    async fn find_by_id(&self, loan_id: Uuid) -> EngineResult<Option<Loan>>;

    async fn find_by_application_number(&self, application_number: &str) -> EngineResult<Option<Loan>>;

    /// Any loan belonging to `borrower_id` whose status counts as active
    /// (§4.2 single-active-loan rule).
    async fn find_active_for_borrower(&self, borrower_id: Uuid) -> EngineResult<Option<Loan>>;

    async fn list_by_borrower(&self, borrower_id: Uuid) -> EngineResult<Vec<Loan>>;

    /// Conditional update: `loan.version` is the version the caller last
    /// read. Returns the stored loan with `version` incremented on success.
    async fn update_cas(&self, loan: Loan) -> EngineResult<Loan>;
}
