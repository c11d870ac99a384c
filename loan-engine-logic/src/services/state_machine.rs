use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use heapless::String as HeaplessString;
use loan_engine_api::domain::{Loan, LoanApproval, LoanRejection, LoanStatus};
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_api::service::LoanStateMachine;
use loan_engine_db::Store;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::reference::new_reference;
use crate::status::push_history;
use crate::{audit, money};

/// Implements the legal transition graph and monetary derivation described
/// in §4.2, against whatever `Store` is plugged in.
pub struct LoanStateMachineImpl {
    store: Arc<dyn Store>,
}

impl LoanStateMachineImpl {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(&self, loan_id: Uuid) -> EngineResult<Loan> {
        self.store
            .loans()
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))
    }

    fn require_transition(loan: &Loan, to: LoanStatus) -> EngineResult<()> {
        if loan.status.legal_next(to) {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                from: loan.status,
                to,
            })
        }
    }
}

#[async_trait]
impl LoanStateMachine for LoanStateMachineImpl {
    async fn submit_loan(
        &self,
        borrower_id: Uuid,
        purpose: &str,
        annual_interest_rate: Decimal,
        requested_amount: Decimal,
        tenor_months: u32,
    ) -> EngineResult<Loan> {
        if requested_amount <= Decimal::ZERO {
            return Err(EngineError::Validation {
                field: "requested_amount".into(),
                message: "must be positive".into(),
            });
        }
        if !(1..=60).contains(&tenor_months) {
            return Err(EngineError::Validation {
                field: "tenor_months".into(),
                message: "must be between 1 and 60".into(),
            });
        }
        if let Some(existing) = self.store.loans().find_active_for_borrower(borrower_id).await? {
            return Err(EngineError::ActiveLoanExists {
                account_id: borrower_id,
                existing_loan_id: existing.id,
            });
        }

        let principal = requested_amount;
        let (total_interest, total_repayable, monthly_payment) =
            money::derive_schedule_totals(principal, annual_interest_rate, tenor_months);

        let now = Utc::now();
        let loan = Loan {
            id: Uuid::new_v4(),
            application_number: HeaplessString::try_from(new_reference("APP").as_str())
                .map_err(|_| EngineError::Internal("application number overflow".into()))?,
            borrower_id,
            purpose: HeaplessString::try_from(purpose)
                .map_err(|_| EngineError::Validation {
                    field: "purpose".into(),
                    message: "too long".into(),
                })?,
            annual_interest_rate,
            requested_amount,
            tenor_months,
            status: LoanStatus::Pending,
            principal,
            total_interest,
            total_repayable,
            monthly_payment,
            total_repaid: Decimal::ZERO,
            outstanding_balance: total_repayable,
            approval: None,
            rejection: None,
            disbursement: None,
            status_history: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let loan = self.store.loans().insert(loan).await?;
        audit::record(
            self.store.as_ref(),
            "Loan",
            loan.id,
            "LOAN_SUBMITTED",
            borrower_id,
            None::<&Loan>,
            Some(&loan),
            None,
        )
        .await?;
        Ok(loan)
    }

    async fn begin_review(&self, loan_id: Uuid, operator_id: Uuid) -> EngineResult<Loan> {
        let previous = self.load(loan_id).await?;
        Self::require_transition(&previous, LoanStatus::UnderReview)?;

        let mut updated = previous.clone();
        push_history(
            &mut updated,
            previous.status,
            LoanStatus::UnderReview,
            None,
            operator_id,
        );
        let updated = self.store.loans().update_cas(updated).await?;
        audit::record(
            self.store.as_ref(),
            "Loan",
            loan_id,
            "LOAN_REVIEW_STARTED",
            operator_id,
            Some(&previous),
            Some(&updated),
            None,
        )
        .await?;
        Ok(updated)
    }

    async fn approve(
        &self,
        loan_id: Uuid,
        operator_id: Uuid,
        approved_amount: Decimal,
        conditions: Option<String>,
    ) -> EngineResult<Loan> {
        let previous = self.load(loan_id).await?;
        Self::require_transition(&previous, LoanStatus::Approved)?;
        if approved_amount <= Decimal::ZERO || approved_amount > previous.requested_amount {
            return Err(EngineError::Validation {
                field: "approved_amount".into(),
                message: "must be positive and no greater than the requested amount".into(),
            });
        }

        let (total_interest, total_repayable, monthly_payment) =
            money::derive_schedule_totals(approved_amount, previous.annual_interest_rate, previous.tenor_months);

        let mut updated = previous.clone();
        updated.principal = approved_amount;
        updated.total_interest = total_interest;
        updated.total_repayable = total_repayable;
        updated.monthly_payment = monthly_payment;
        updated.outstanding_balance = total_repayable;
        updated.approval = Some(LoanApproval {
            operator_id,
            approved_amount,
            conditions: conditions
                .as_deref()
                .and_then(|c| HeaplessString::try_from(c).ok()),
            approved_at: Utc::now(),
        });
        push_history(&mut updated, previous.status, LoanStatus::Approved, None, operator_id);

        let updated = self.store.loans().update_cas(updated).await?;
        audit::record(
            self.store.as_ref(),
            "Loan",
            loan_id,
            "LOAN_APPROVED",
            operator_id,
            Some(&previous),
            Some(&updated),
            None,
        )
        .await?;
        Ok(updated)
    }

    async fn reject(&self, loan_id: Uuid, operator_id: Uuid, reason: String) -> EngineResult<Loan> {
        let previous = self.load(loan_id).await?;
        Self::require_transition(&previous, LoanStatus::Rejected)?;

        let mut updated = previous.clone();
        updated.rejection = Some(LoanRejection {
            operator_id,
            reason: HeaplessString::try_from(reason.as_str()).map_err(|_| EngineError::Validation {
                field: "reason".into(),
                message: "too long".into(),
            })?,
            rejected_at: Utc::now(),
        });
        push_history(
            &mut updated,
            previous.status,
            LoanStatus::Rejected,
            Some(reason.as_str()),
            operator_id,
        );

        let updated = self.store.loans().update_cas(updated).await?;
        audit::record(
            self.store.as_ref(),
            "Loan",
            loan_id,
            "LOAN_REJECTED",
            operator_id,
            Some(&previous),
            Some(&updated),
            None,
        )
        .await?;
        Ok(updated)
    }

    async fn mark_defaulted(&self, loan_id: Uuid, operator_id: Uuid, reason: String) -> EngineResult<Loan> {
        let previous = self.load(loan_id).await?;
        Self::require_transition(&previous, LoanStatus::Defaulted)?;

        let mut updated = previous.clone();
        push_history(
            &mut updated,
            previous.status,
            LoanStatus::Defaulted,
            Some(reason.as_str()),
            operator_id,
        );

        let updated = self.store.loans().update_cas(updated).await?;
        audit::record(
            self.store.as_ref(),
            "Loan",
            loan_id,
            "LOAN_DEFAULTED",
            operator_id,
            Some(&previous),
            Some(&updated),
            Some(reason.as_str()),
        )
        .await?;
        Ok(updated)
    }
}
