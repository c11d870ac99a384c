use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use heapless::String as HeaplessString;
use loan_engine_api::domain::money::round2;
use loan_engine_api::domain::{
    Installment, InstallmentAllocation, InstallmentStatus, LoanStatus, ManualProofBundle,
    NotificationKind, Payment, PaymentAllocation, PaymentStatus, PaymentType, RepaymentOutcome,
};
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_api::service::{NotificationHub, PaymentProvider, RepaymentEngine, VerificationDecision};
use loan_engine_db::Store;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::audit;
use crate::reference::new_reference;
use crate::status::push_history;

pub struct RepaymentEngineImpl {
    store: Arc<dyn Store>,
    provider: Arc<dyn PaymentProvider>,
    notifications: Arc<dyn NotificationHub>,
    cas_retry_limit: u8,
}

impl RepaymentEngineImpl {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn PaymentProvider>,
        notifications: Arc<dyn NotificationHub>,
        cas_retry_limit: u8,
    ) -> Self {
        Self {
            store,
            provider,
            notifications,
            cas_retry_limit,
        }
    }

    /// FIFO allocation across `{pending, partial, overdue}` installments
    /// (§4.4 step 4). Returns the allocations applied and any leftover
    /// amount (overpayment).
    async fn allocate(&self, loan_id: Uuid, amount: Decimal) -> EngineResult<(Vec<InstallmentAllocation>, Decimal)> {
        let outstanding = self.store.installments().find_outstanding_by_loan(loan_id).await?;
        let mut remaining = amount;
        let mut allocations = Vec::new();

        for installment in outstanding {
            if remaining <= Decimal::ZERO {
                break;
            }
            let due = installment.remaining_due();
            let applied = remaining.min(due);
            if applied <= Decimal::ZERO {
                continue;
            }

            let mut updated = installment.clone();
            updated.paid_amount = round2(updated.paid_amount + applied);
            if updated.paid_amount >= updated.total_due {
                updated.status = InstallmentStatus::Paid;
                updated.paid_at = Some(Utc::now());
            } else {
                updated.status = InstallmentStatus::Partial;
            }
            self.store.installments().update_cas(updated).await?;

            allocations.push(InstallmentAllocation {
                installment_number: installment.installment_number,
                amount_applied: applied,
            });
            remaining -= applied;
        }

        Ok((allocations, remaining.max(Decimal::ZERO)))
    }

    /// Steps 4-8 of §4.4, shared by the direct and manual-proof paths.
    async fn apply_payment(&self, mut payment: Payment) -> EngineResult<RepaymentOutcome> {
        let (allocations, overpayment) = self.allocate(payment.loan_id, payment.amount).await?;
        let applied = payment.amount - overpayment;

        payment.allocation = Some(PaymentAllocation {
            principal: applied,
            interest: Decimal::ZERO,
            overpayment,
        });

        let mut loan = self
            .store
            .loans()
            .find_by_id(payment.loan_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {}", payment.loan_id)))?;

        let mut attempts = 0u8;
        let (loan, completion_snapshot) = loop {
            let previous = loan.clone();
            let mut candidate = loan.clone();
            candidate.total_repaid = round2(candidate.total_repaid + applied);
            candidate.outstanding_balance = round2(candidate.total_repayable - candidate.total_repaid);
            let completing = candidate.outstanding_balance <= Decimal::ZERO && candidate.status == LoanStatus::Active;
            if completing {
                push_history(
                    &mut candidate,
                    LoanStatus::Active,
                    LoanStatus::Completed,
                    None,
                    payment.account_id,
                );
            }

            match self.store.loans().update_cas(candidate).await {
                Ok(updated) => break (updated, completing.then_some(previous)),
                Err(EngineError::Concurrency { .. }) if attempts < self.cas_retry_limit => {
                    attempts += 1;
                    loan = self
                        .store
                        .loans()
                        .find_by_id(payment.loan_id)
                        .await?
                        .ok_or_else(|| EngineError::NotFound(format!("loan {}", payment.loan_id)))?;
                    continue;
                }
                Err(err) => return Err(err),
            }
        };

        payment.status = PaymentStatus::Success;
        payment.reconciled = true;
        payment.reconciled_at = Some(Utc::now());
        let payment = self.store.payments().update_cas(payment).await?;

        audit::record(
            self.store.as_ref(),
            "Payment",
            payment.id,
            "REPAYMENT_PROCESSED",
            payment.account_id,
            None::<&Payment>,
            Some(&payment),
            None,
        )
        .await?;

        if let Some(previous) = completion_snapshot {
            audit::record(
                self.store.as_ref(),
                "Loan",
                loan.id,
                "LOAN_COMPLETED",
                payment.account_id,
                Some(&previous),
                Some(&loan),
                None,
            )
            .await?;
        }

        if loan.status == LoanStatus::Completed {
            self.notifications
                .notify(
                    loan.borrower_id,
                    NotificationKind::LoanCompleted,
                    "Loan completed",
                    &format!("Loan {} is fully repaid", loan.application_number.as_str()),
                    None,
                )
                .await?;
        }
        self.notifications
            .notify(
                payment.account_id,
                NotificationKind::PaymentReceived,
                "Payment received",
                &format!("Payment of {} received", payment.amount),
                None,
            )
            .await?;
        self.notifications
            .notify_operators(
                NotificationKind::PaymentReceived,
                "Payment received",
                &format!("Loan {} received a payment", loan.application_number.as_str()),
                None,
            )
            .await?;

        Ok(RepaymentOutcome {
            loan,
            payment,
            allocations,
            overpayment,
        })
    }

    async fn fail_payment(&self, mut payment: Payment, reason: String) -> EngineResult<Payment> {
        payment.status = PaymentStatus::Failed;
        payment.failure_reason = HeaplessString::try_from(reason.as_str()).ok();
        self.store.payments().update_cas(payment).await
    }
}

#[async_trait]
impl RepaymentEngine for RepaymentEngineImpl {
    async fn process_repayment(
        &self,
        loan_id: Uuid,
        account_id: Uuid,
        amount: Decimal,
        idempotency_key: &str,
    ) -> EngineResult<RepaymentOutcome> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation {
                field: "amount".into(),
                message: "must be positive".into(),
            });
        }

        // 1. Idempotency short-circuit.
        if let Some(existing) = self.store.payments().find_by_idempotency_key(idempotency_key).await? {
            match existing.status {
                PaymentStatus::Success => {
                    let loan = self
                        .store
                        .loans()
                        .find_by_id(loan_id)
                        .await?
                        .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))?;
                    return Ok(RepaymentOutcome {
                        loan,
                        payment: existing,
                        allocations: Vec::new(),
                        overpayment: Decimal::ZERO,
                    });
                }
                PaymentStatus::Pending | PaymentStatus::Processing => {
                    return Err(EngineError::IdempotencyInFlight {
                        key: idempotency_key.to_string(),
                    });
                }
                PaymentStatus::Failed => {}
            }
        }

        // 2. Validate.
        let loan = self
            .store
            .loans()
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))?;
        if loan.borrower_id != account_id {
            return Err(EngineError::NotOwned { loan_id, account_id });
        }
        if loan.status != LoanStatus::Active {
            return Err(EngineError::NotActive { loan_id });
        }

        // 3. Create intent.
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            loan_id,
            account_id,
            idempotency_key: HeaplessString::try_from(idempotency_key)
                .map_err(|_| EngineError::Validation {
                    field: "idempotency_key".into(),
                    message: "too long".into(),
                })?,
            reference: HeaplessString::try_from(new_reference("PAY").as_str())
                .map_err(|_| EngineError::Internal("reference overflow".into()))?,
            kind: PaymentType::Repayment,
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
            refund_source_payment_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        let payment = self.store.payments().insert(payment).await?;

        // 3a. Provider-backed debit (§1: direct repayment is a "provider-backed
        // debit"). The borrower's linked account on file is the destination the
        // loan was disbursed to.
        let destination = loan
            .disbursement
            .as_ref()
            .map(|d| d.bank_destination.clone())
            .ok_or_else(|| EngineError::Conflict(format!("loan {loan_id} has no disbursement destination on file")))?;
        let narration = format!("Repayment for loan {}", loan.application_number.as_str());
        let debit = self
            .provider
            .debit(amount, &destination, &narration, payment.reference.as_str())
            .await;
        let payment = match debit {
            Ok(result) if result.success => {
                let mut debited = payment.clone();
                debited.provider_reference = result
                    .provider_reference
                    .as_deref()
                    .and_then(|r| HeaplessString::try_from(r).ok());
                self.store.payments().update_cas(debited).await?
            }
            Ok(result) => {
                let reason = result.message.unwrap_or_else(|| "repayment debit failed".into());
                self.fail_payment(payment, reason.clone()).await.ok();
                return Err(EngineError::ProviderFailure {
                    message: reason,
                    retryable: true,
                });
            }
            Err(err) => {
                self.fail_payment(payment, err.to_string()).await.ok();
                return Err(err);
            }
        };

        // 4-8. Allocate, detect overpayment, CAS the balance, finalize.
        match self.apply_payment(payment.clone()).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.fail_payment(payment, err.to_string()).await.ok();
                Err(err)
            }
        }
    }

    async fn submit_manual_repayment(
        &self,
        loan_id: Uuid,
        account_id: Uuid,
        amount: Decimal,
        idempotency_key: &str,
        proof: ManualProofBundle,
    ) -> EngineResult<Payment> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation {
                field: "amount".into(),
                message: "must be positive".into(),
            });
        }
        if let Some(existing) = self.store.payments().find_by_idempotency_key(idempotency_key).await? {
            return Ok(existing);
        }

        let loan = self
            .store
            .loans()
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))?;
        if loan.borrower_id != account_id {
            return Err(EngineError::NotOwned { loan_id, account_id });
        }
        if loan.status != LoanStatus::Active {
            return Err(EngineError::NotActive { loan_id });
        }

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            loan_id,
            account_id,
            idempotency_key: HeaplessString::try_from(idempotency_key)
                .map_err(|_| EngineError::Validation {
                    field: "idempotency_key".into(),
                    message: "too long".into(),
                })?,
            reference: HeaplessString::try_from(new_reference("MPF").as_str())
                .map_err(|_| EngineError::Internal("reference overflow".into()))?,
            kind: PaymentType::Repayment,
            amount,
            status: PaymentStatus::Pending,
            failure_reason: None,
            provider_reference: None,
            reconciled: false,
            reconciled_at: None,
            allocation: None,
            manual_proof: Some(proof),
            verified_by: None,
            verified_at: None,
            overpayment_refunded: false,
            refund_source_payment_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        let payment = self.store.payments().insert(payment).await?;
        audit::record(
            self.store.as_ref(),
            "Payment",
            payment.id,
            "MANUAL_PROOF_SUBMITTED",
            account_id,
            None::<&Payment>,
            Some(&payment),
            None,
        )
        .await?;
        Ok(payment)
    }

    async fn verify_manual_repayment(
        &self,
        payment_id: Uuid,
        operator_id: Uuid,
        decision: VerificationDecision,
    ) -> EngineResult<Payment> {
        let payment = self
            .store
            .payments()
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payment {payment_id}")))?;
        if payment.status != PaymentStatus::Pending {
            return Err(EngineError::Conflict(format!(
                "payment {payment_id} is not pending verification"
            )));
        }

        match decision {
            VerificationDecision::Success => {
                let loan = self
                    .store
                    .loans()
                    .find_by_id(payment.loan_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("loan {}", payment.loan_id)))?;
                if loan.status != LoanStatus::Active {
                    return Err(EngineError::NotActive { loan_id: payment.loan_id });
                }

                let mut verified = payment.clone();
                verified.status = PaymentStatus::Processing;
                verified.verified_by = Some(operator_id);
                verified.verified_at = Some(Utc::now());
                let verified = self.store.payments().update_cas(verified).await?;

                let outcome = self.apply_payment(verified).await?;
                audit::record(
                    self.store.as_ref(),
                    "Payment",
                    payment_id,
                    "MANUAL_PROOF_VERIFIED",
                    operator_id,
                    Some(&payment),
                    Some(&outcome.payment),
                    None,
                )
                .await?;
                Ok(outcome.payment)
            }
            VerificationDecision::Failed { reason } => {
                let mut rejected = payment.clone();
                rejected.status = PaymentStatus::Failed;
                rejected.failure_reason = HeaplessString::try_from(reason.as_str()).ok();
                rejected.verified_by = Some(operator_id);
                rejected.verified_at = Some(Utc::now());
                let rejected = self.store.payments().update_cas(rejected).await?;
                audit::record(
                    self.store.as_ref(),
                    "Payment",
                    payment_id,
                    "MANUAL_PROOF_REJECTED",
                    operator_id,
                    Some(&payment),
                    Some(&rejected),
                    Some(reason.as_str()),
                )
                .await?;
                self.notifications
                    .notify(
                        rejected.account_id,
                        NotificationKind::PaymentRejected,
                        "Payment rejected",
                        &reason,
                        None,
                    )
                    .await?;
                Ok(rejected)
            }
        }
    }

    async fn mark_overdue_installments(&self, loan_id: Uuid) -> EngineResult<Vec<Installment>> {
        let now = Utc::now();
        let outstanding = self.store.installments().find_outstanding_by_loan(loan_id).await?;
        let mut changed = Vec::new();
        for installment in outstanding {
            let derived = installment.derive_status(now);
            if derived != installment.status {
                let mut updated = installment.clone();
                updated.status = derived;
                let updated = self.store.installments().update_cas(updated).await?;
                changed.push(updated);
            }
        }
        Ok(changed)
    }
}
