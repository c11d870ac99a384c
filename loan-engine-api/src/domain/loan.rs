use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Legal status graph (see `LoanStateMachine`):
///
/// ```text
/// pending      -> under_review
/// under_review -> approved | rejected
/// approved     -> disbursed
/// disbursed    -> active
/// active       -> completed | defaulted
/// rejected, completed, defaulted: terminal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Disbursed,
    Active,
    Completed,
    Defaulted,
}

impl LoanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Defaulted)
    }

    /// Does an account in this status count toward the single-active-loan rule?
    pub fn counts_as_active(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::UnderReview | Self::Approved | Self::Active
        )
    }

    pub fn legal_next(self, to: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, to),
            (Pending, UnderReview)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
                | (Approved, Disbursed)
                | (Disbursed, Active)
                | (Active, Completed)
                | (Active, Defaulted)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApproval {
    pub operator_id: Uuid,
    pub approved_amount: Decimal,
    pub conditions: Option<HeaplessString<500>>,
    pub approved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRejection {
    pub operator_id: Uuid,
    pub reason: HeaplessString<500>,
    pub rejected_at: DateTime<Utc>,
}

/// Bank destination a disbursement is sent to, or a manual-proof sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDestination {
    pub account_number: HeaplessString<34>,
    pub bank_code: HeaplessString<16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDisbursement {
    pub reference: HeaplessString<40>,
    pub provider_reference: Option<HeaplessString<64>>,
    pub bank_destination: BankDestination,
    pub operator_id: Uuid,
    pub disbursed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanStatusChange {
    pub from: LoanStatus,
    pub to: LoanStatus,
    pub reason: Option<HeaplessString<300>>,
    pub performed_by: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub application_number: HeaplessString<32>,
    pub borrower_id: Uuid,
    pub purpose: HeaplessString<200>,
    pub annual_interest_rate: Decimal,
    pub requested_amount: Decimal,
    pub tenor_months: u32,

    pub status: LoanStatus,
    pub principal: Decimal,
    pub total_interest: Decimal,
    pub total_repayable: Decimal,
    pub monthly_payment: Decimal,
    pub total_repaid: Decimal,
    pub outstanding_balance: Decimal,

    pub approval: Option<LoanApproval>,
    pub rejection: Option<LoanRejection>,
    pub disbursement: Option<LoanDisbursement>,
    pub status_history: Vec<LoanStatusChange>,

    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// `totalRepayable == principal + totalInterest` (§3 invariant).
    pub fn invariant_total_repayable(&self) -> bool {
        self.total_repayable == self.principal + self.total_interest
    }

    /// `outstandingBalance == totalRepayable - totalRepaid` (§3 invariant).
    pub fn invariant_outstanding(&self) -> bool {
        self.outstanding_balance == self.total_repayable - self.total_repaid
    }
}
