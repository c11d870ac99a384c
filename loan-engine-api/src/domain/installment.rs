use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// One scheduled repayment slice of a loan. `installment_number` is unique
/// per loan (the `(loan_id, installment_number)` uniqueness constraint from
/// §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub principal_share: Decimal,
    pub interest_share: Decimal,
    pub total_due: Decimal,
    pub paid_amount: Decimal,
    pub status: InstallmentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Installment {
    /// Re-derive `status` from `paid_amount` and `due_date` — overdue only
    /// applies when the installment is not fully paid and the due date has
    /// passed (§3).
    pub fn derive_status(&self, now: DateTime<Utc>) -> InstallmentStatus {
        if self.paid_amount >= self.total_due {
            InstallmentStatus::Paid
        } else if now.date_naive() > self.due_date {
            InstallmentStatus::Overdue
        } else if self.paid_amount > Decimal::ZERO {
            InstallmentStatus::Partial
        } else {
            InstallmentStatus::Pending
        }
    }

    pub fn remaining_due(&self) -> Decimal {
        self.total_due - self.paid_amount
    }

    pub fn is_outstanding(&self) -> bool {
        matches!(
            self.status,
            InstallmentStatus::Pending | InstallmentStatus::Partial | InstallmentStatus::Overdue
        )
    }
}
