use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{BankDestination, Loan};
use crate::error::EngineResult;

/// Two-phase reservation + provider transfer + compensation (§4.3). On
/// provider success the repayment schedule is generated atomically; on
/// failure the loan reverts to `approved` with a cleared disbursement
/// reference so a retry gets a fresh one.
#[async_trait]
pub trait DisbursementProtocol: Send + Sync {
    async fn disburse(
        &self,
        loan_id: Uuid,
        operator_id: Uuid,
        destination: BankDestination,
    ) -> EngineResult<Loan>;
}
