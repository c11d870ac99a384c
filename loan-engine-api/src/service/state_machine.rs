use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::Loan;
use crate::error::EngineResult;

/// Encodes the legal loan transitions, the monetary derivation performed at
/// creation and at reduced-amount approval, and the single-active-loan
/// rule. Every transition appends a `LoanStatusChange` and one `AuditEntry`.
#[async_trait]
pub trait LoanStateMachine: Send + Sync {
    /// Submit a new loan application. Fails with `ActiveLoanExists` if the
    /// borrower already has a loan in {pending, under_review, approved,
    /// active}.
    async fn submit_loan(
        &self,
        borrower_id: Uuid,
        purpose: &str,
        annual_interest_rate: Decimal,
        requested_amount: Decimal,
        tenor_months: u32,
    ) -> EngineResult<Loan>;

    /// `pending -> under_review`.
    async fn begin_review(&self, loan_id: Uuid, operator_id: Uuid) -> EngineResult<Loan>;

    /// `under_review -> approved`. Re-derives principal/interest/schedule
    /// totals from `approved_amount` inside the same versioned update.
    async fn approve(
        &self,
        loan_id: Uuid,
        operator_id: Uuid,
        approved_amount: Decimal,
        conditions: Option<String>,
    ) -> EngineResult<Loan>;

    /// `under_review -> rejected`.
    async fn reject(&self, loan_id: Uuid, operator_id: Uuid, reason: String) -> EngineResult<Loan>;

    /// `active -> defaulted`. Per the open question in spec §9, this engine
    /// treats defaulting as operator-invoked only; no background overdue
    /// sweep drives it automatically.
    async fn mark_defaulted(
        &self,
        loan_id: Uuid,
        operator_id: Uuid,
        reason: String,
    ) -> EngineResult<Loan>;
}
