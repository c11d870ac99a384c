use chrono::{DateTime, NaiveDate, Utc};
use heapless::String as HeaplessString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Repayment,
    Refund,
    Reversal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

/// How a repayment amount was applied. `principal`/`interest` are
/// informational only — the installment ledger is the record of truth; only
/// `overpayment` drives engine behavior (§4.4 step 5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub principal: Decimal,
    pub interest: Decimal,
    pub overpayment: Decimal,
}

/// Out-of-band bank transfer evidence submitted by a borrower pending
/// operator verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualProofBundle {
    pub sender_bank: HeaplessString<120>,
    pub sender_name: HeaplessString<120>,
    pub transfer_date: NaiveDate,
    pub external_reference: HeaplessString<80>,
    pub evidence_url: HeaplessString<300>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub account_id: Uuid,
    pub idempotency_key: HeaplessString<128>,
    pub reference: HeaplessString<40>,
    pub kind: PaymentType,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub failure_reason: Option<HeaplessString<300>>,
    pub provider_reference: Option<HeaplessString<64>>,
    pub reconciled: bool,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub allocation: Option<PaymentAllocation>,
    pub manual_proof: Option<ManualProofBundle>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub overpayment_refunded: bool,
    /// For `kind == Refund`: the payment whose success or overpayment it reverses.
    pub refund_source_payment_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_manual_proof(&self) -> bool {
        self.manual_proof.is_some()
    }
}

/// One FIFO allocation step recorded against an installment during
/// repayment processing (§4.4 step 4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstallmentAllocation {
    pub installment_number: u32,
    pub amount_applied: Decimal,
}

/// Result of a completed repayment: the loan's new snapshot, the finalized
/// payment, and the per-installment breakdown of where the money went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentOutcome {
    pub loan: crate::domain::Loan,
    pub payment: Payment,
    pub allocations: Vec<InstallmentAllocation>,
    pub overpayment: Decimal,
}
