//! Row-to-model conversion helpers, following the `TryFromRow` /
//! `get_heapless_string` pattern the teacher workspace uses in
//! `banking-db-postgres::utils` for turning a `PgRow` into a domain model
//! without losing the bounded-string invariants those models carry.

use heapless::String as HeaplessString;
use loan_engine_api::domain::{AccountRole, InstallmentStatus, LoanStatus, NotificationKind, NotificationStatus, PaymentStatus, PaymentType};
use loan_engine_api::error::EngineError;
use serde::de::DeserializeOwned;
use sqlx::{postgres::PgRow, Row};
use std::str::FromStr;

/// Converts a row into a domain model. Implemented directly on the
/// `loan-engine-api` domain types (allowed because the trait, not the
/// type, is local to this crate — the same orphan-rule shape the teacher
/// relies on for `TryFromRow<PgRow> for CountryModel`).
pub trait TryFromRow: Sized {
    fn try_from_row(row: &PgRow) -> Result<Self, EngineError>;
}

fn decode_err(col: &str, err: impl std::fmt::Display) -> EngineError {
    EngineError::Internal(format!("failed to decode column '{col}': {err}"))
}

pub fn get_heapless_string<const N: usize>(row: &PgRow, col: &str) -> Result<HeaplessString<N>, EngineError> {
    let value: String = row.try_get(col).map_err(|e| decode_err(col, e))?;
    HeaplessString::from_str(&value)
        .map_err(|_| EngineError::Internal(format!("column '{col}' exceeds its {N}-byte bound")))
}

pub fn get_optional_heapless_string<const N: usize>(
    row: &PgRow,
    col: &str,
) -> Result<Option<HeaplessString<N>>, EngineError> {
    let value: Option<String> = row.try_get(col).map_err(|e| decode_err(col, e))?;
    value
        .map(|v| HeaplessString::from_str(&v))
        .transpose()
        .map_err(|_| EngineError::Internal(format!("column '{col}' exceeds its {N}-byte bound")))
}

pub fn get_json<T: DeserializeOwned>(row: &PgRow, col: &str) -> Result<T, EngineError> {
    let value: serde_json::Value = row.try_get(col).map_err(|e| decode_err(col, e))?;
    serde_json::from_value(value).map_err(|e| decode_err(col, e))
}

pub fn get_optional_json<T: DeserializeOwned>(row: &PgRow, col: &str) -> Result<Option<T>, EngineError> {
    let value: Option<serde_json::Value> = row.try_get(col).map_err(|e| decode_err(col, e))?;
    value.map(serde_json::from_value).transpose().map_err(|e| decode_err(col, e))
}

pub fn loan_status_to_str(status: LoanStatus) -> &'static str {
    match status {
        LoanStatus::Pending => "pending",
        LoanStatus::UnderReview => "under_review",
        LoanStatus::Approved => "approved",
        LoanStatus::Rejected => "rejected",
        LoanStatus::Disbursed => "disbursed",
        LoanStatus::Active => "active",
        LoanStatus::Completed => "completed",
        LoanStatus::Defaulted => "defaulted",
    }
}

pub fn loan_status_from_str(value: &str) -> Result<LoanStatus, EngineError> {
    match value {
        "pending" => Ok(LoanStatus::Pending),
        "under_review" => Ok(LoanStatus::UnderReview),
        "approved" => Ok(LoanStatus::Approved),
        "rejected" => Ok(LoanStatus::Rejected),
        "disbursed" => Ok(LoanStatus::Disbursed),
        "active" => Ok(LoanStatus::Active),
        "completed" => Ok(LoanStatus::Completed),
        "defaulted" => Ok(LoanStatus::Defaulted),
        other => Err(EngineError::Internal(format!("unknown loan status '{other}'"))),
    }
}

pub fn installment_status_to_str(status: InstallmentStatus) -> &'static str {
    match status {
        InstallmentStatus::Pending => "pending",
        InstallmentStatus::Partial => "partial",
        InstallmentStatus::Paid => "paid",
        InstallmentStatus::Overdue => "overdue",
    }
}

pub fn installment_status_from_str(value: &str) -> Result<InstallmentStatus, EngineError> {
    match value {
        "pending" => Ok(InstallmentStatus::Pending),
        "partial" => Ok(InstallmentStatus::Partial),
        "paid" => Ok(InstallmentStatus::Paid),
        "overdue" => Ok(InstallmentStatus::Overdue),
        other => Err(EngineError::Internal(format!("unknown installment status '{other}'"))),
    }
}

pub fn payment_type_to_str(kind: PaymentType) -> &'static str {
    match kind {
        PaymentType::Repayment => "repayment",
        PaymentType::Refund => "refund",
        PaymentType::Reversal => "reversal",
    }
}

pub fn payment_type_from_str(value: &str) -> Result<PaymentType, EngineError> {
    match value {
        "repayment" => Ok(PaymentType::Repayment),
        "refund" => Ok(PaymentType::Refund),
        "reversal" => Ok(PaymentType::Reversal),
        other => Err(EngineError::Internal(format!("unknown payment type '{other}'"))),
    }
}

pub fn payment_status_to_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Processing => "processing",
        PaymentStatus::Success => "success",
        PaymentStatus::Failed => "failed",
    }
}

pub fn payment_status_from_str(value: &str) -> Result<PaymentStatus, EngineError> {
    match value {
        "pending" => Ok(PaymentStatus::Pending),
        "processing" => Ok(PaymentStatus::Processing),
        "success" => Ok(PaymentStatus::Success),
        "failed" => Ok(PaymentStatus::Failed),
        other => Err(EngineError::Internal(format!("unknown payment status '{other}'"))),
    }
}

pub fn account_role_to_str(role: AccountRole) -> &'static str {
    match role {
        AccountRole::Borrower => "borrower",
        AccountRole::Operator => "operator",
    }
}

pub fn account_role_from_str(value: &str) -> Result<AccountRole, EngineError> {
    match value {
        "borrower" => Ok(AccountRole::Borrower),
        "operator" => Ok(AccountRole::Operator),
        other => Err(EngineError::Internal(format!("unknown account role '{other}'"))),
    }
}

pub fn notification_status_to_str(status: NotificationStatus) -> &'static str {
    match status {
        NotificationStatus::Pending => "pending",
        NotificationStatus::Sent => "sent",
        NotificationStatus::Failed => "failed",
    }
}

pub fn notification_status_from_str(value: &str) -> Result<NotificationStatus, EngineError> {
    match value {
        "pending" => Ok(NotificationStatus::Pending),
        "sent" => Ok(NotificationStatus::Sent),
        "failed" => Ok(NotificationStatus::Failed),
        other => Err(EngineError::Internal(format!("unknown notification status '{other}'"))),
    }
}

pub fn notification_kind_to_str(kind: NotificationKind) -> &'static str {
    kind.as_str()
}

pub fn notification_kind_from_str(value: &str) -> Result<NotificationKind, EngineError> {
    match value {
        "LOAN_UNDER_REVIEW" => Ok(NotificationKind::LoanUnderReview),
        "LOAN_APPROVED" => Ok(NotificationKind::LoanApproved),
        "LOAN_REJECTED" => Ok(NotificationKind::LoanRejected),
        "LOAN_DISBURSED" => Ok(NotificationKind::LoanDisbursed),
        "LOAN_COMPLETED" => Ok(NotificationKind::LoanCompleted),
        "LOAN_DEFAULTED" => Ok(NotificationKind::LoanDefaulted),
        "PAYMENT_RECEIVED" => Ok(NotificationKind::PaymentReceived),
        "PAYMENT_VERIFIED" => Ok(NotificationKind::PaymentVerified),
        "PAYMENT_REJECTED" => Ok(NotificationKind::PaymentRejected),
        "REFUND_ISSUED" => Ok(NotificationKind::RefundIssued),
        other => Err(EngineError::Internal(format!("unknown notification kind '{other}'"))),
    }
}
