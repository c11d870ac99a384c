use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Installment, ManualProofBundle, Payment, RepaymentOutcome};
use crate::error::EngineResult;

/// Operator's decision on a submitted manual proof.
#[derive(Debug, Clone)]
pub enum VerificationDecision {
    Success,
    Failed { reason: String },
}

/// FIFO allocation across the installment schedule, with an idempotent
/// direct-debit path and a manual-proof path that defers allocation until
/// an operator verifies (§4.4).
#[async_trait]
pub trait RepaymentEngine: Send + Sync {
    /// Direct (provider-backed) repayment. Idempotent on `idempotency_key`:
    /// a retry with the same key and a prior `success` Payment returns that
    /// payment's outcome without re-allocating.
    async fn process_repayment(
        &self,
        loan_id: Uuid,
        account_id: Uuid,
        amount: Decimal,
        idempotency_key: &str,
    ) -> EngineResult<RepaymentOutcome>;

    /// Submit out-of-band transfer evidence. Creates a `pending` Payment;
    /// does not touch installments or loan balances until verified.
    async fn submit_manual_repayment(
        &self,
        loan_id: Uuid,
        account_id: Uuid,
        amount: Decimal,
        idempotency_key: &str,
        proof: ManualProofBundle,
    ) -> EngineResult<Payment>;

    /// Operator verification of a pending manual-proof payment. `Success`
    /// runs the same allocation steps a direct repayment would; `Failed`
    /// marks the payment failed with no effect on the loan.
    async fn verify_manual_repayment(
        &self,
        payment_id: Uuid,
        operator_id: Uuid,
        decision: VerificationDecision,
    ) -> EngineResult<Payment>;

    /// Maintenance operation: re-derive `Installment.status = overdue` for
    /// installments whose due date has passed without full payment. Does
    /// not drive loan-level status (see DESIGN.md on automatic default).
    async fn mark_overdue_installments(&self, loan_id: Uuid) -> EngineResult<Vec<Installment>>;
}
