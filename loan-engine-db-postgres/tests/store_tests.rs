mod commons;

use chrono::Utc;
use heapless::String as HeaplessString;
use loan_engine_api::domain::{Loan, LoanStatus};
use loan_engine_api::error::EngineError;
use loan_engine_db::LoanRepository;
use rust_decimal::Decimal;
use sqlx::Row;
use uuid::Uuid;

async fn seed_borrower(pool: &sqlx::PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO accounts (id, email, credential_hash, role, active, version, created_at, updated_at)
        VALUES ($1, $2, 'hash', 'borrower', true, 0, now(), now())
        "#,
    )
    .bind(id)
    .bind(format!("{id}@example.test"))
    .execute(pool)
    .await
    .expect("seed borrower");
    id
}

fn sample_loan(borrower_id: Uuid, application_number: &str) -> Loan {
    let now = Utc::now();
    Loan {
        id: Uuid::new_v4(),
        application_number: HeaplessString::try_from(application_number).unwrap(),
        borrower_id,
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

/// Round-trips a loan through the real driver, including its jsonb-backed
/// `status_history` column, and checks the CAS `UPDATE ... WHERE version`
/// behaves the same way `loan_engine_db::MemoryStore` does in-process.
#[tokio::test]
async fn insert_then_cas_update_then_stale_update_rejected() {
    let Some(store) = commons::test_store().await else {
        return;
    };
    let borrower_id = seed_borrower(store.pool()).await;
    let loan = sample_loan(borrower_id, "APP-PG-0001");

    let inserted = store.loans().insert(loan).await.expect("insert loan");
    assert_eq!(inserted.version, 0);

    let mut fresh = inserted.clone();
    fresh.status = LoanStatus::UnderReview;
    let updated = store.loans().update_cas(fresh).await.expect("first update wins");
    assert_eq!(updated.version, 1);
    assert!(matches!(updated.status, LoanStatus::UnderReview));

    let mut stale = inserted;
    stale.status = LoanStatus::Rejected;
    let err = store.loans().update_cas(stale).await.unwrap_err();
    assert_eq!(err.kind(), "concurrency");
}

#[tokio::test]
async fn duplicate_application_number_is_rejected() {
    let Some(store) = commons::test_store().await else {
        return;
    };
    let borrower_id = seed_borrower(store.pool()).await;
    let loan = sample_loan(borrower_id, "APP-PG-0002");
    store.loans().insert(loan.clone()).await.expect("first insert");

    let mut duplicate = sample_loan(borrower_id, "");
    duplicate.application_number = loan.application_number.clone();
    let err = store.loans().insert(duplicate).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn find_active_for_borrower_excludes_terminal_loans() {
    let Some(store) = commons::test_store().await else {
        return;
    };
    let borrower_id = seed_borrower(store.pool()).await;
    let mut completed = sample_loan(borrower_id, "APP-PG-0003");
    completed.status = LoanStatus::Completed;
    store.loans().insert(completed).await.expect("insert completed loan");

    assert!(store
        .loans()
        .find_active_for_borrower(borrower_id)
        .await
        .expect("query")
        .is_none());

    let active = sample_loan(borrower_id, "APP-PG-0004");
    let active_id = store.loans().insert(active).await.expect("insert active loan").id;

    let found = store
        .loans()
        .find_active_for_borrower(borrower_id)
        .await
        .expect("query")
        .expect("one active loan");
    assert_eq!(found.id, active_id);
}
