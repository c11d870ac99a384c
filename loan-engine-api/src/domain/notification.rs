use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

/// Event kinds emitted by the engine's protocols. Carried as a plain string
/// on the wire (`type`) so a future event can be added without a schema
/// migration on the notification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    LoanUnderReview,
    LoanApproved,
    LoanRejected,
    LoanDisbursed,
    LoanCompleted,
    LoanDefaulted,
    PaymentReceived,
    PaymentVerified,
    PaymentRejected,
    RefundIssued,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoanUnderReview => "LOAN_UNDER_REVIEW",
            Self::LoanApproved => "LOAN_APPROVED",
            Self::LoanRejected => "LOAN_REJECTED",
            Self::LoanDisbursed => "LOAN_DISBURSED",
            Self::LoanCompleted => "LOAN_COMPLETED",
            Self::LoanDefaulted => "LOAN_DEFAULTED",
            Self::PaymentReceived => "PAYMENT_RECEIVED",
            Self::PaymentVerified => "PAYMENT_VERIFIED",
            Self::PaymentRejected => "PAYMENT_REJECTED",
            Self::RefundIssued => "REFUND_ISSUED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: NotificationKind,
    pub title: HeaplessString<120>,
    pub body: HeaplessString<500>,
    pub data: Option<Value>,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}
