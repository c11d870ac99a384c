pub mod memory;
pub mod repository;

pub use memory::MemoryStore;
pub use repository::*;

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use heapless::String as HeaplessString;
    use loan_engine_api::domain::{Loan, LoanStatus};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;

    fn sample_loan() -> Loan {
        let now = Utc::now();
        Loan {
            id: Uuid::new_v4(),
            application_number: HeaplessString::try_from("APP-0001").unwrap(),
            borrower_id: Uuid::new_v4(),
            purpose: HeaplessString::try_from("car").unwrap(),
            annual_interest_rate: Decimal::new(12, 2),
            requested_amount: Decimal::new(100000, 2),
            tenor_months: 12,
            status: LoanStatus::Pending,
            principal: Decimal::new(100000, 2),
            total_interest: Decimal::ZERO,
            total_repayable: Decimal::new(100000, 2),
            monthly_payment: Decimal::ZERO,
            total_repaid: Decimal::ZERO,
            outstanding_balance: Decimal::new(100000, 2),
            approval: None,
            rejection: None,
            disbursement: None,
            status_history: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_application_number() {
        let store = MemoryStore::new();
        let loan = sample_loan();
        store.loans().insert(loan.clone()).await.unwrap();

        let found = store
            .loans()
            .find_by_application_number("APP-0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, loan.id);
    }

    #[tokio::test]
    async fn duplicate_application_number_is_rejected() {
        let store = MemoryStore::new();
        let loan = sample_loan();
        store.loans().insert(loan.clone()).await.unwrap();

        let mut duplicate = sample_loan();
        duplicate.application_number = loan.application_number.clone();
        let err = store.loans().insert(duplicate).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn stale_version_is_rejected_on_update() {
        let store = MemoryStore::new();
        let loan = sample_loan();
        let inserted = store.loans().insert(loan).await.unwrap();

        let mut stale = inserted.clone();
        let mut fresh = inserted.clone();
        fresh.status = LoanStatus::UnderReview;
        store.loans().update_cas(fresh).await.unwrap();

        stale.status = LoanStatus::Rejected;
        let err = store.loans().update_cas(stale).await.unwrap_err();
        assert!(err.is_retryable_concurrency());
    }
}
