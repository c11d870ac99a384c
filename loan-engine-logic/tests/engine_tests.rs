use std::str::FromStr;
use std::sync::Arc;

use loan_engine_api::domain::{
    Account, AccountRole, BankDestination, LoanStatus, ManualProofBundle, PaymentStatus,
};
use loan_engine_api::service::{
    DisbursementProtocol, LoanStateMachine, NotificationHub, RefundProtocol, RepaymentEngine,
    VerificationDecision,
};
use loan_engine_db::{MemoryStore, Store};
use loan_engine_logic::services::{
    DisbursementProtocolImpl, LoanStateMachineImpl, MockPaymentProvider, NotificationHubImpl,
    RefundProtocolImpl, RepaymentEngineImpl,
};
use rust_decimal::Decimal;
use uuid::Uuid;

struct Harness {
    store: Arc<MemoryStore>,
    provider: Arc<MockPaymentProvider>,
    state_machine: LoanStateMachineImpl,
    disbursement: DisbursementProtocolImpl,
    repayment: RepaymentEngineImpl,
    refund: RefundProtocolImpl,
}

fn harness() -> Harness {
    harness_with_provider(MockPaymentProvider::new())
}

fn harness_with_provider(provider: MockPaymentProvider) -> Harness {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let provider = Arc::new(provider);
    let notifications = Arc::new(NotificationHubImpl::new(store.clone()));

    let state_machine = LoanStateMachineImpl::new(store.clone() as Arc<dyn Store>);
    let disbursement = DisbursementProtocolImpl::new(
        store.clone() as Arc<dyn Store>,
        provider.clone(),
        notifications.clone(),
    );
    let repayment = RepaymentEngineImpl::new(
        store.clone() as Arc<dyn Store>,
        provider.clone(),
        notifications.clone(),
        3,
    );
    let refund = RefundProtocolImpl::new(store.clone() as Arc<dyn Store>, provider.clone(), notifications);

    Harness {
        provider,
        store,
        state_machine,
        disbursement,
        repayment,
        refund,
    }
}

fn seed_borrower(store: &MemoryStore) -> Uuid {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();
    store.seed_account(Account {
        id,
        email: heapless::String::try_from("borrower@example.com").unwrap(),
        credential_hash: heapless::String::try_from("hash").unwrap(),
        role: AccountRole::Borrower,
        active: true,
        encrypted_national_id: None,
        credit_score: None,
        version: 0,
        created_at: now,
        updated_at: now,
    });
    id
}

fn destination() -> BankDestination {
    BankDestination {
        account_number: heapless::String::try_from("0011223344").unwrap(),
        bank_code: heapless::String::try_from("058").unwrap(),
    }
}

#[tokio::test]
async fn scenario_one_happy_path_clears_in_ten_installments() {
    let h = harness();
    let operator_id = Uuid::new_v4();
    let borrower_id = seed_borrower(&h.store);

    let loan = h
        .state_machine
        .submit_loan(
            borrower_id,
            "car",
            Decimal::from_str("0.15").unwrap(),
            Decimal::from(100_000),
            10,
        )
        .await
        .unwrap();
    assert_eq!(loan.total_interest, Decimal::from_str("12500.00").unwrap());
    assert_eq!(loan.total_repayable, Decimal::from_str("112500.00").unwrap());
    assert_eq!(loan.monthly_payment, Decimal::from_str("11250.00").unwrap());

    h.state_machine.begin_review(loan.id, operator_id).await.unwrap();
    h.state_machine
        .approve(loan.id, operator_id, Decimal::from(100_000), None)
        .await
        .unwrap();
    let active = h.disbursement.disburse(loan.id, operator_id, destination()).await.unwrap();
    assert_eq!(active.status, LoanStatus::Active);

    let installments = h.store.installments().find_by_loan(loan.id).await.unwrap();
    assert_eq!(installments.len(), 10);

    let mut final_loan = active;
    for i in 0..10 {
        let outcome = h
            .repayment
            .process_repayment(
                loan.id,
                borrower_id,
                Decimal::from_str("11250.00").unwrap(),
                &format!("idem-happy-{i}"),
            )
            .await
            .unwrap();
        final_loan = outcome.loan;
    }

    assert_eq!(final_loan.status, LoanStatus::Completed);
    assert_eq!(final_loan.outstanding_balance, Decimal::ZERO);
    assert_eq!(final_loan.total_repaid, final_loan.total_repayable);

    let installments = h.store.installments().find_by_loan(loan.id).await.unwrap();
    let paid_sum: Decimal = installments.iter().map(|i| i.paid_amount).sum();
    assert_eq!(paid_sum, final_loan.total_repaid);
}

#[tokio::test]
async fn scenario_two_reduced_approval_rederives_totals() {
    let h = harness();
    let operator_id = Uuid::new_v4();
    let borrower_id = seed_borrower(&h.store);

    let loan = h
        .state_machine
        .submit_loan(
            borrower_id,
            "school fees",
            Decimal::from_str("0.15").unwrap(),
            Decimal::from(100_000),
            10,
        )
        .await
        .unwrap();
    h.state_machine.begin_review(loan.id, operator_id).await.unwrap();
    let approved = h
        .state_machine
        .approve(loan.id, operator_id, Decimal::from(60_000), None)
        .await
        .unwrap();

    assert_eq!(approved.principal, Decimal::from(60_000));
    assert_eq!(approved.total_interest, Decimal::from_str("7500.00").unwrap());
    assert_eq!(approved.total_repayable, Decimal::from_str("67500.00").unwrap());
    assert_eq!(approved.monthly_payment, Decimal::from_str("6750.00").unwrap());
    assert_eq!(approved.outstanding_balance, approved.total_repayable);
}

#[tokio::test]
async fn scenario_three_overpayment_completes_and_refunds_once() {
    let h = harness();
    let operator_id = Uuid::new_v4();
    let borrower_id = seed_borrower(&h.store);

    let loan = h
        .state_machine
        .submit_loan(borrower_id, "equipment", Decimal::ZERO, Decimal::from(5_000), 1)
        .await
        .unwrap();
    h.state_machine.begin_review(loan.id, operator_id).await.unwrap();
    h.state_machine
        .approve(loan.id, operator_id, Decimal::from(5_000), None)
        .await
        .unwrap();
    h.disbursement.disburse(loan.id, operator_id, destination()).await.unwrap();

    let outcome = h
        .repayment
        .process_repayment(loan.id, borrower_id, Decimal::from(6_000), "idem-overpay")
        .await
        .unwrap();

    assert_eq!(outcome.loan.status, LoanStatus::Completed);
    assert_eq!(outcome.overpayment, Decimal::from(1_000));
    assert_eq!(outcome.payment.allocation.unwrap().overpayment, Decimal::from(1_000));

    let first = h
        .refund
        .refund_overpayment(outcome.payment.id, operator_id, "idem-refund", None)
        .await
        .unwrap();
    let second = h
        .refund
        .refund_overpayment(outcome.payment.id, operator_id, "idem-refund", None)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let all_payments = h.store.payments().list_by_loan(loan.id).await.unwrap();
    let refund_count = all_payments
        .iter()
        .filter(|p| p.kind == loan_engine_api::domain::PaymentType::Refund)
        .count();
    assert_eq!(refund_count, 1);

    let loan_after = h.store.loans().find_by_id(loan.id).await.unwrap().unwrap();
    assert_eq!(loan_after.outstanding_balance, Decimal::ZERO);
}

#[tokio::test]
async fn scenario_four_idempotent_retry_allocates_once() {
    let h = harness();
    let operator_id = Uuid::new_v4();
    let borrower_id = seed_borrower(&h.store);

    let loan = h
        .state_machine
        .submit_loan(
            borrower_id,
            "car",
            Decimal::from_str("0.15").unwrap(),
            Decimal::from(100_000),
            10,
        )
        .await
        .unwrap();
    h.state_machine.begin_review(loan.id, operator_id).await.unwrap();
    h.state_machine
        .approve(loan.id, operator_id, Decimal::from(100_000), None)
        .await
        .unwrap();
    h.disbursement.disburse(loan.id, operator_id, destination()).await.unwrap();

    let first = h
        .repayment
        .process_repayment(loan.id, borrower_id, Decimal::from_str("11250.00").unwrap(), "same-key")
        .await
        .unwrap();
    let second = h
        .repayment
        .process_repayment(loan.id, borrower_id, Decimal::from_str("11250.00").unwrap(), "same-key")
        .await
        .unwrap();

    assert_eq!(first.payment.id, second.payment.id);
    assert_eq!(first.loan.total_repaid, second.loan.total_repaid);

    let payments = h.store.payments().list_by_loan(loan.id).await.unwrap();
    assert_eq!(payments.len(), 1);
}

#[tokio::test]
async fn scenario_five_disbursement_failure_reverts_and_retries() {
    let h = harness_with_provider(MockPaymentProvider::always_failing());
    let operator_id = Uuid::new_v4();
    let borrower_id = seed_borrower(&h.store);

    let loan = h
        .state_machine
        .submit_loan(borrower_id, "car", Decimal::from_str("0.1").unwrap(), Decimal::from(10_000), 6)
        .await
        .unwrap();
    h.state_machine.begin_review(loan.id, operator_id).await.unwrap();
    h.state_machine
        .approve(loan.id, operator_id, Decimal::from(10_000), None)
        .await
        .unwrap();

    let err = h.disbursement.disburse(loan.id, operator_id, destination()).await.unwrap_err();
    assert!(matches!(err, loan_engine_api::error::EngineError::ProviderFailure { .. }));

    let reverted = h.store.loans().find_by_id(loan.id).await.unwrap().unwrap();
    assert_eq!(reverted.status, LoanStatus::Approved);
    assert!(reverted.disbursement.is_none());
    assert_eq!(reverted.status_history.len(), 3);

    let installments = h.store.installments().find_by_loan(loan.id).await.unwrap();
    assert!(installments.is_empty());

    // A second disbursement attempt, after the provider recovers, succeeds.
    h.provider.set_failing(false);
    let succeeded = h.disbursement.disburse(loan.id, operator_id, destination()).await.unwrap();
    assert_eq!(succeeded.status, LoanStatus::Active);
    assert_eq!(succeeded.status_history.len(), 4);

    let installments = h.store.installments().find_by_loan(loan.id).await.unwrap();
    assert_eq!(installments.len(), 6);
}

#[tokio::test]
async fn scenario_six_manual_proof_rejection_leaves_loan_unchanged() {
    let h = harness();
    let operator_id = Uuid::new_v4();
    let borrower_id = seed_borrower(&h.store);

    let loan = h
        .state_machine
        .submit_loan(
            borrower_id,
            "car",
            Decimal::from_str("0.15").unwrap(),
            Decimal::from(100_000),
            10,
        )
        .await
        .unwrap();
    h.state_machine.begin_review(loan.id, operator_id).await.unwrap();
    h.state_machine
        .approve(loan.id, operator_id, Decimal::from(100_000), None)
        .await
        .unwrap();
    h.disbursement.disburse(loan.id, operator_id, destination()).await.unwrap();

    let proof = ManualProofBundle {
        sender_bank: heapless::String::try_from("GTBank").unwrap(),
        sender_name: heapless::String::try_from("Jane Doe").unwrap(),
        transfer_date: chrono::Utc::now().date_naive(),
        external_reference: heapless::String::try_from("EXT-1").unwrap(),
        evidence_url: heapless::String::try_from("https://example.com/proof.png").unwrap(),
    };

    let submitted = h
        .repayment
        .submit_manual_repayment(
            loan.id,
            borrower_id,
            Decimal::from_str("11250.00").unwrap(),
            "manual-1",
            proof,
        )
        .await
        .unwrap();
    assert_eq!(submitted.status, PaymentStatus::Pending);

    let rejected = h
        .repayment
        .verify_manual_repayment(
            submitted.id,
            operator_id,
            VerificationDecision::Failed {
                reason: "wrong reference".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, PaymentStatus::Failed);

    let loan_after = h.store.loans().find_by_id(loan.id).await.unwrap().unwrap();
    assert_eq!(loan_after.total_repaid, Decimal::ZERO);
    let installments = h.store.installments().find_by_loan(loan.id).await.unwrap();
    assert!(installments.iter().all(|i| i.paid_amount == Decimal::ZERO));

    // A fresh idempotency key creates a new pending Payment.
    let proof2 = ManualProofBundle {
        sender_bank: heapless::String::try_from("GTBank").unwrap(),
        sender_name: heapless::String::try_from("Jane Doe").unwrap(),
        transfer_date: chrono::Utc::now().date_naive(),
        external_reference: heapless::String::try_from("EXT-2").unwrap(),
        evidence_url: heapless::String::try_from("https://example.com/proof2.png").unwrap(),
    };
    let resubmitted = h
        .repayment
        .submit_manual_repayment(
            loan.id,
            borrower_id,
            Decimal::from_str("11250.00").unwrap(),
            "manual-2",
            proof2,
        )
        .await
        .unwrap();
    assert_ne!(resubmitted.id, submitted.id);
}

#[tokio::test]
async fn notification_hub_persists_before_push_and_tracks_presence() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let hub = NotificationHubImpl::new(store.clone());
    let account_id = seed_borrower(&store);

    assert!(!hub.is_online(account_id));
    let subscription = hub.subscribe(account_id, "token").await.unwrap();
    assert!(hub.is_online(account_id));

    let notification = hub
        .notify(
            account_id,
            loan_engine_api::domain::NotificationKind::LoanApproved,
            "Approved",
            "Your loan was approved",
            None,
        )
        .await
        .unwrap();
    let history = store.notifications().list_by_account(account_id, 10, 0).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, notification.id);

    hub.unsubscribe(account_id, subscription);
    assert!(!hub.is_online(account_id));
}
