use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Months, Utc};
use heapless::String as HeaplessString;
use loan_engine_api::domain::money::round2;
use loan_engine_api::domain::{
    BankDestination, Installment, InstallmentStatus, Loan, LoanDisbursement, LoanStatus,
    NotificationKind,
};
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_api::service::{DisbursementProtocol, NotificationHub, PaymentProvider};
use loan_engine_db::Store;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::audit;
use crate::reference::new_reference;
use crate::status::push_history;

/// Two-phase reservation + external transfer + compensation, per §4.3.
pub struct DisbursementProtocolImpl {
    store: Arc<dyn Store>,
    provider: Arc<dyn PaymentProvider>,
    notifications: Arc<dyn NotificationHub>,
}

impl DisbursementProtocolImpl {
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

    fn build_schedule(loan: &Loan) -> EngineResult<Vec<Installment>> {
        let n = loan.tenor_months;
        if n == 0 {
            return Err(EngineError::Internal("tenor_months is zero".into()));
        }
        let tenor = Decimal::from(n);
        let principal_share = round2(loan.principal / tenor);
        let interest_share = round2(loan.total_interest / tenor);

        let mut installments = Vec::with_capacity(n as usize);
        let mut principal_acc = Decimal::ZERO;
        let mut interest_acc = Decimal::ZERO;
        let base_date = Utc::now().date_naive();

        for i in 1..=n {
            let due_date = base_date
                .checked_add_months(Months::new(i))
                .ok_or_else(|| EngineError::Internal("due date overflow".into()))?;

            let (p_share, i_share) = if i == n {
                (
                    round2(loan.principal - principal_acc),
                    round2(loan.total_interest - interest_acc),
                )
            } else {
                (principal_share, interest_share)
            };
            principal_acc += p_share;
            interest_acc += i_share;

            installments.push(Installment {
                id: Uuid::new_v4(),
                loan_id: loan.id,
                installment_number: i,
                due_date,
                principal_share: p_share,
                interest_share: i_share,
                total_due: round2(p_share + i_share),
                paid_amount: Decimal::ZERO,
                status: InstallmentStatus::Pending,
                paid_at: None,
                version: 0,
            });
        }
        Ok(installments)
    }
}

#[async_trait]
impl DisbursementProtocol for DisbursementProtocolImpl {
    async fn disburse(
        &self,
        loan_id: Uuid,
        operator_id: Uuid,
        destination: BankDestination,
    ) -> EngineResult<Loan> {
        let loan = self
            .store
            .loans()
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))?;

        if loan.status != LoanStatus::Approved {
            return Err(EngineError::InvalidTransition {
                from: loan.status,
                to: LoanStatus::Disbursed,
            });
        }
        if loan.disbursement.is_some() {
            return Err(EngineError::AlreadyDisbursed { loan_id });
        }

        // 1. Reserve.
        let reference = new_reference("DSB");
        let mut reserved = loan.clone();
        reserved.disbursement = Some(LoanDisbursement {
            reference: HeaplessString::try_from(reference.as_str())
                .map_err(|_| EngineError::Internal("reference overflow".into()))?,
            provider_reference: None,
            bank_destination: destination.clone(),
            operator_id,
            disbursed_at: None,
        });
        push_history(&mut reserved, loan.status, LoanStatus::Disbursed, None, operator_id);
        let reserved = self.store.loans().update_cas(reserved).await?;
        audit::record(
            self.store.as_ref(),
            "Loan",
            loan_id,
            "DISBURSEMENT_RESERVED",
            operator_id,
            Some(&loan),
            Some(&reserved),
            None,
        )
        .await?;

        // 2. External transfer.
        let narration = format!("Loan disbursement {}", reserved.application_number.as_str());
        let result = self
            .provider
            .transfer(reserved.principal, &destination, &narration, &reference)
            .await?;

        if result.success {
            // 3. Commit.
            let mut committed = reserved.clone();
            if let Some(disbursement) = committed.disbursement.as_mut() {
                disbursement.provider_reference = result
                    .provider_reference
                    .as_deref()
                    .and_then(|r| HeaplessString::try_from(r).ok());
                disbursement.disbursed_at = Some(Utc::now());
            }
            push_history(&mut committed, reserved.status, LoanStatus::Active, None, operator_id);
            let committed = self.store.loans().update_cas(committed).await?;

            let schedule = Self::build_schedule(&committed)?;
            self.store.installments().insert_schedule(schedule).await?;

            audit::record(
                self.store.as_ref(),
                "Loan",
                loan_id,
                "DISBURSEMENT_COMMITTED",
                operator_id,
                Some(&reserved),
                Some(&committed),
                None,
            )
            .await?;
            self.notifications
                .notify(
                    committed.borrower_id,
                    NotificationKind::LoanDisbursed,
                    "Loan disbursed",
                    &format!("Your loan {} has been disbursed", committed.application_number.as_str()),
                    None,
                )
                .await?;
            Ok(committed)
        } else {
            // 4. Compensate.
            let mut reverted = reserved.clone();
            reverted.disbursement = None;
            push_history(
                &mut reverted,
                reserved.status,
                LoanStatus::Approved,
                result.message.as_deref(),
                operator_id,
            );
            let reverted = self.store.loans().update_cas(reverted).await?;
            audit::record(
                self.store.as_ref(),
                "Loan",
                loan_id,
                "DISBURSEMENT_COMPENSATED",
                operator_id,
                Some(&reserved),
                Some(&reverted),
                result.message.as_deref(),
            )
            .await?;
            Err(EngineError::ProviderFailure {
                message: result.message.unwrap_or_else(|| "disbursement transfer failed".into()),
                retryable: true,
            })
        }
    }
}
