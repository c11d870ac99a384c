use async_trait::async_trait;
use loan_engine_api::service::{CreditAdvisory, CreditScorer};
use uuid::Uuid;

/// Deterministic replacement for the source system's randomized advisory
/// scorer (§9 open question: "for tests, inject a deterministic scorer").
/// Hashes the account id with `blake3` and folds the digest into a score in
/// `[300, 850]`, the conventional credit-score range — same account, same
/// verification flag, same score, every time.
pub struct DeterministicCreditScorer;

impl DeterministicCreditScorer {
    const MIN_SCORE: u16 = 300;
    const MAX_SCORE: u16 = 850;
    const APPROVAL_THRESHOLD: u16 = 620;
}

#[async_trait]
impl CreditScorer for DeterministicCreditScorer {
    async fn score(&self, account_id: Uuid, identifier_verified: bool) -> CreditAdvisory {
        let digest = blake3::hash(account_id.as_bytes());
        let bytes = digest.as_bytes();
        let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let span = (Self::MAX_SCORE - Self::MIN_SCORE) as u32;
        let mut score = Self::MIN_SCORE + (raw % (span + 1)) as u16;

        if !identifier_verified {
            score = score.saturating_sub(100).max(Self::MIN_SCORE);
        }

        CreditAdvisory {
            score,
            recommend_approval: identifier_verified && score >= Self::APPROVAL_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_account_scores_identically() {
        let scorer = DeterministicCreditScorer;
        let account_id = Uuid::new_v4();
        let first = scorer.score(account_id, true).await;
        let second = scorer.score(account_id, true).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unverified_identifier_never_recommends_approval() {
        let scorer = DeterministicCreditScorer;
        let advisory = scorer.score(Uuid::new_v4(), false).await;
        assert!(!advisory.recommend_approval);
    }
}
