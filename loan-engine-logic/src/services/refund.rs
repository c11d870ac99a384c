use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use heapless::String as HeaplessString;
use loan_engine_api::domain::money::round2;
use loan_engine_api::domain::{NotificationKind, Payment, PaymentStatus, PaymentType};
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_api::service::{NotificationHub, PaymentProvider, RefundProtocol};
use loan_engine_db::Store;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::audit;
use crate::reference::new_reference;

/// Overpayment and full-payment reversal via the provider, per §4.5.
pub struct RefundProtocolImpl {
    store: Arc<dyn Store>,
    provider: Arc<dyn PaymentProvider>,
    notifications: Arc<dyn NotificationHub>,
}

impl RefundProtocolImpl {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn PaymentProvider>,
        notifications: Arc<dyn NotificationHub>,
    ) -> Self {
        Self {
            store,
            provider,
            notifications,
        }
    }

    fn new_refund_payment(
        source: &Payment,
        amount: Decimal,
        idempotency_key: &str,
    ) -> EngineResult<Payment> {
        let now = Utc::now();
        Ok(Payment {
            id: Uuid::new_v4(),
            loan_id: source.loan_id,
            account_id: source.account_id,
            idempotency_key: HeaplessString::try_from(idempotency_key)
                .map_err(|_| EngineError::Validation {
                    field: "idempotency_key".into(),
                    message: "too long".into(),
                })?,
            reference: HeaplessString::try_from(new_reference("RFD").as_str())
                .map_err(|_| EngineError::Internal("reference overflow".into()))?,
            kind: PaymentType::Refund,
            amount,
            status: PaymentStatus::Processing,
            failure_reason: None,
            provider_reference: None,
            reconciled: false,
            reconciled_at: None,
            allocation: None,
            manual_proof: None,
            verified_by: None,
            verified_at: None,
            overpayment_refunded: false,
            refund_source_payment_id: Some(source.id),
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn notify_refund(&self, account_id: Uuid, amount: Decimal) -> EngineResult<()> {
        self.notifications
            .notify(
                account_id,
                NotificationKind::RefundIssued,
                "Refund issued",
                &format!("A refund of {amount} has been issued"),
                None,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RefundProtocol for RefundProtocolImpl {
    async fn refund_full_payment(
        &self,
        source_payment_id: Uuid,
        operator_id: Uuid,
        idempotency_key: &str,
    ) -> EngineResult<Payment> {
        if let Some(existing) = self.store.payments().find_by_idempotency_key(idempotency_key).await? {
            return Ok(existing);
        }

        let source = self
            .store
            .payments()
            .find_by_id(source_payment_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payment {source_payment_id}")))?;
        if source.status != PaymentStatus::Success {
            return Err(EngineError::Conflict(format!(
                "payment {source_payment_id} is not a successful repayment"
            )));
        }

        let refund = Self::new_refund_payment(&source, source.amount, idempotency_key)?;
        let refund = self.store.payments().insert(refund).await?;

        // Mirrors the external reservation-then-transfer pattern used by
        // disbursement (§4.3), scaled down to a single call since a refund
        // has no local state to reserve ahead of the provider call.
        let loan = self
            .store
            .loans()
            .find_by_id(source.loan_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {}", source.loan_id)))?;
        let destination = loan
            .disbursement
            .as_ref()
            .map(|d| d.bank_destination.clone())
            .ok_or_else(|| EngineError::Conflict("loan has no disbursement destination on file".into()))?;

        let result = self
            .provider
            .transfer(
                refund.amount,
                &destination,
                "Full payment refund",
                refund.reference.as_str(),
            )
            .await?;

        if !result.success {
            let mut failed = refund.clone();
            failed.status = PaymentStatus::Failed;
            failed.failure_reason = result
                .message
                .as_deref()
                .and_then(|m| HeaplessString::try_from(m).ok());
            let failed = self.store.payments().update_cas(failed).await?;
            return Ok(failed);
        }

        let mut finalized = refund.clone();
        finalized.status = PaymentStatus::Success;
        finalized.reconciled = true;
        finalized.reconciled_at = Some(Utc::now());
        finalized.provider_reference = result
            .provider_reference
            .as_deref()
            .and_then(|r| HeaplessString::try_from(r).ok());
        let finalized = self.store.payments().update_cas(finalized).await?;

        // Restore the debt: decrease totalRepaid, increase outstandingBalance.
        // Installment paidAmount is deliberately left untouched; see
        // DESIGN.md for the resulting documented drift (§9 open question).
        let mut updated_loan = loan.clone();
        updated_loan.total_repaid = round2(updated_loan.total_repaid - refund.amount);
        updated_loan.outstanding_balance = round2(updated_loan.total_repayable - updated_loan.total_repaid);
        let updated_loan = self.store.loans().update_cas(updated_loan).await?;

        audit::record(
            self.store.as_ref(),
            "Payment",
            finalized.id,
            "FULL_REFUND_ISSUED",
            operator_id,
            Some(&source),
            Some(&finalized),
            Some(
                "totalRepaid decreased by the refunded amount; installment paidAmount was not \
                 reallocated, so Σ installment.paidAmount may now exceed loan.totalRepaid",
            ),
        )
        .await?;
        audit::record(
            self.store.as_ref(),
            "Loan",
            updated_loan.id,
            "LOAN_BALANCE_RESTORED",
            operator_id,
            Some(&loan),
            Some(&updated_loan),
            None,
        )
        .await?;

        self.notify_refund(finalized.account_id, finalized.amount).await?;
        Ok(finalized)
    }

    async fn refund_overpayment(
        &self,
        source_payment_id: Uuid,
        operator_id: Uuid,
        idempotency_key: &str,
        amount: Option<Decimal>,
    ) -> EngineResult<Payment> {
        if let Some(existing) = self.store.payments().find_by_idempotency_key(idempotency_key).await? {
            return Ok(existing);
        }

        let source = self
            .store
            .payments()
            .find_by_id(source_payment_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payment {source_payment_id}")))?;
        if source.overpayment_refunded {
            return Err(EngineError::AlreadyRefunded {
                payment_id: source_payment_id,
            });
        }
        let overpayment = source
            .allocation
            .map(|a| a.overpayment)
            .unwrap_or(Decimal::ZERO);
        if overpayment <= Decimal::ZERO {
            return Err(EngineError::Conflict(format!(
                "payment {source_payment_id} has no recorded overpayment"
            )));
        }
        let refund_amount = amount.unwrap_or(overpayment);
        if refund_amount <= Decimal::ZERO || refund_amount > overpayment {
            return Err(EngineError::Validation {
                field: "amount".into(),
                message: "must be positive and no greater than the recorded overpayment".into(),
            });
        }

        let refund = Self::new_refund_payment(&source, refund_amount, idempotency_key)?;
        let refund = self.store.payments().insert(refund).await?;

        let loan = self
            .store
            .loans()
            .find_by_id(source.loan_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {}", source.loan_id)))?;
        let destination = loan
            .disbursement
            .as_ref()
            .map(|d| d.bank_destination.clone())
            .ok_or_else(|| EngineError::Conflict("loan has no disbursement destination on file".into()))?;

        let result = self
            .provider
            .transfer(
                refund.amount,
                &destination,
                "Overpayment refund",
                refund.reference.as_str(),
            )
            .await?;

        let mut source_updated = source.clone();
        if result.success {
            let mut finalized = refund.clone();
            finalized.status = PaymentStatus::Success;
            finalized.reconciled = true;
            finalized.reconciled_at = Some(Utc::now());
            finalized.provider_reference = result
                .provider_reference
                .as_deref()
                .and_then(|r| HeaplessString::try_from(r).ok());
            let finalized = self.store.payments().update_cas(finalized).await?;

            source_updated.overpayment_refunded = true;
            let source_updated = self.store.payments().update_cas(source_updated).await?;

            audit::record(
                self.store.as_ref(),
                "Payment",
                finalized.id,
                "OVERPAYMENT_REFUND_ISSUED",
                operator_id,
                Some(&source_updated),
                Some(&finalized),
                None,
            )
            .await?;
            self.notify_refund(finalized.account_id, finalized.amount).await?;
            Ok(finalized)
        } else {
            let mut failed = refund.clone();
            failed.status = PaymentStatus::Failed;
            failed.failure_reason = result
                .message
                .as_deref()
                .and_then(|m| HeaplessString::try_from(m).ok());
            let failed = self.store.payments().update_cas(failed).await?;
            Ok(failed)
        }
    }
}
