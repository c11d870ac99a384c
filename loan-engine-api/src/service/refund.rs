use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::Payment;
use crate::error::EngineResult;

/// Overpayment and full-payment reversal via the payment provider (§4.5).
#[async_trait]
pub trait RefundProtocol: Send + Sync {
    /// Refund a prior successful repayment in full. Restores the refunded
    /// amount to `totalRepaid`/`outstandingBalance`; does not reallocate
    /// installments (documented drift, see DESIGN.md).
    async fn refund_full_payment(
        &self,
        source_payment_id: Uuid,
        operator_id: Uuid,
        idempotency_key: &str,
    ) -> EngineResult<Payment>;

    /// Refund only the excess recorded on `source_payment.allocation.overpayment`,
    /// or an operator-specified `amount` no greater than that excess. Loan
    /// balances are untouched — the money was never applied to the debt.
    /// Fails with `AlreadyRefunded` if the source payment's
    /// `overpayment_refunded` flag is already set.
    async fn refund_overpayment(
        &self,
        source_payment_id: Uuid,
        operator_id: Uuid,
        idempotency_key: &str,
        amount: Option<Decimal>,
    ) -> EngineResult<Payment>;
}
