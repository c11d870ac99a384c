use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::BankDestination;
use crate::error::EngineResult;

/// Result of an out-of-process provider call. `success = false` is not an
/// `Err` — the engine needs the latency and message even on failure to log
/// and compensate (§4.3 step 4); only a timeout or transport fault is an
/// `Err(EngineError::ProviderFailure)`.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub success: bool,
    pub provider_reference: Option<String>,
    pub message: Option<String>,
    pub latency: std::time::Duration,
    pub observed_at: DateTime<Utc>,
}

/// Out-of-process transfer/debit primitives (§2). Every call is bounded by
/// an implementer-chosen timeout of at most 30 seconds (§5); a timeout
/// surfaces as `EngineError::ProviderFailure { retryable: true, .. }`.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Disbursement or refund transfer to a borrower's bank destination.
    /// `reference` is idempotent at the provider boundary by convention —
    /// retrying the same reference must not double-transfer.
    async fn transfer(
        &self,
        amount: Decimal,
        destination: &BankDestination,
        narration: &str,
        reference: &str,
    ) -> EngineResult<ProviderResult>;

    /// Direct debit from a borrower's linked account for a repayment.
    async fn debit(
        &self,
        amount: Decimal,
        source: &BankDestination,
        narration: &str,
        reference: &str,
    ) -> EngineResult<ProviderResult>;
}
