use async_trait::async_trait;
use uuid::Uuid;

/// Advisory credit decision. Never gates loan creation — `CreditScorer` is
/// consulted by callers that want a recommendation, not by
/// `LoanStateMachine::submit_loan` itself (§1, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditAdvisory {
    pub score: u16,
    pub recommend_approval: bool,
}

/// Pure, deterministic advisory scoring. The source system's scorer used a
/// random component, making its decisions unreproducible; §9 asks
/// implementations to inject a deterministic scorer for tests instead.
#[async_trait]
pub trait CreditScorer: Send + Sync {
    async fn score(&self, account_id: Uuid, identifier_verified: bool) -> CreditAdvisory;
}
