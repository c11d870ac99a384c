//! In-memory `Store` implementation. Promotes the `Mutex<Vec<_>>` mock
//! pattern the teacher workspace hand-rolls per test
//! (`banking-logic/tests/person_service_tests.rs`) to a first-class,
//! fully CAS-correct implementation, so unit tests across the engine share
//! one real store instead of re-implementing a mock each time, and so the
//! engine has a store that runs with no external infrastructure (spec §5,
//! §8).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loan_engine_api::domain::{
    Account, AuditEntry, IdempotencyRecord, Installment, Loan, Notification, Payment,
};
use loan_engine_api::error::{EngineError, EngineResult};
use uuid::Uuid;

use crate::repository::{
    AccountRepository, AuditLogRepository, IdempotencyRepository, InstallmentRepository,
    LoanRepository, NotificationRepository, PaymentRepository, Store,
};

#[derive(Default)]
pub struct MemoryStore {
    loans: Mutex<HashMap<Uuid, Loan>>,
    application_numbers: Mutex<HashMap<String, Uuid>>,
    installments: Mutex<HashMap<(Uuid, u32), Installment>>,
    payments: Mutex<HashMap<Uuid, Payment>>,
    idempotency_keys: Mutex<HashMap<String, Uuid>>,
    references: Mutex<HashMap<String, Uuid>>,
    accounts: Mutex<HashMap<Uuid, Account>>,
    audit: Mutex<Vec<AuditEntry>>,
    idempotency: Mutex<HashMap<String, IdempotencyRecord>>,
    notifications: Mutex<HashMap<Uuid, Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account directly (bypasses registration, which is an
    /// external collaborator per spec §1).
    pub fn seed_account(&self, account: Account) {
        self.accounts.lock().unwrap().insert(account.id, account);
    }
}

fn concurrency_err(entity: &str, id: Uuid, expected: i64, actual: i64) -> EngineError {
    EngineError::Concurrency {
        entity: entity.to_string(),
        id,
        expected_version: expected,
        actual_version: actual,
    }
}

#[async_trait]
impl LoanRepository for MemoryStore {
    async fn insert(&self, loan: Loan) -> EngineResult<Loan> {
        let mut loans = self.loans.lock().unwrap();
        let mut app_numbers = self.application_numbers.lock().unwrap();
        let app_number = loan.application_number.as_str().to_string();
        if app_numbers.contains_key(&app_number) {
            return Err(EngineError::Conflict(format!(
                "application number {app_number} already exists"
            )));
        }
        app_numbers.insert(app_number, loan.id);
        loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn find_by_id(&self, loan_id: Uuid) -> EngineResult<Option<Loan>> {
        Ok(self.loans.lock().unwrap().get(&loan_id).cloned())
    }

    async fn find_by_application_number(&self, application_number: &str) -> EngineResult<Option<Loan>> {
        let app_numbers = self.application_numbers.lock().unwrap();
        Ok(app_numbers
            .get(application_number)
            .and_then(|id| self.loans.lock().unwrap().get(id).cloned()))
    }

    async fn find_active_for_borrower(&self, borrower_id: Uuid) -> EngineResult<Option<Loan>> {
        let loans = self.loans.lock().unwrap();
        Ok(loans
            .values()
            .find(|l| l.borrower_id == borrower_id && l.status.counts_as_active())
            .cloned())
    }

    async fn list_by_borrower(&self, borrower_id: Uuid) -> EngineResult<Vec<Loan>> {
        let loans = self.loans.lock().unwrap();
        Ok(loans
            .values()
            .filter(|l| l.borrower_id == borrower_id)
            .cloned()
            .collect())
    }

    async fn update_cas(&self, mut loan: Loan) -> EngineResult<Loan> {
        let mut loans = self.loans.lock().unwrap();
        let current = loans
            .get(&loan.id)
            .ok_or_else(|| EngineError::NotFound(format!("loan {}", loan.id)))?;
        if current.version != loan.version {
            return Err(concurrency_err("Loan", loan.id, loan.version, current.version));
        }
        if let Some(disbursement) = &loan.disbursement {
            let mut references = self.references.lock().unwrap();
            let owns_reference = references
                .get(disbursement.reference.as_str())
                .map(|owner| *owner == loan.id)
                .unwrap_or(false);
            if !owns_reference {
                if references.contains_key(disbursement.reference.as_str()) {
                    return Err(EngineError::Conflict(format!(
                        "disbursement reference {} already exists",
                        disbursement.reference.as_str()
                    )));
                }
                references.insert(disbursement.reference.as_str().to_string(), loan.id);
            }
        }
        loan.version += 1;
        loans.insert(loan.id, loan.clone());
        Ok(loan)
    }
}

#[async_trait]
impl InstallmentRepository for MemoryStore {
    async fn insert_schedule(&self, installments: Vec<Installment>) -> EngineResult<Vec<Installment>> {
        let mut store = self.installments.lock().unwrap();
        for installment in &installments {
            let key = (installment.loan_id, installment.installment_number);
            if store.contains_key(&key) {
                return Err(EngineError::Conflict(format!(
                    "installment {} already exists for loan {}",
                    installment.installment_number, installment.loan_id
                )));
            }
        }
        for installment in &installments {
            let key = (installment.loan_id, installment.installment_number);
            store.insert(key, installment.clone());
        }
        Ok(installments)
    }

    async fn find_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Installment>> {
        let store = self.installments.lock().unwrap();
        let mut rows: Vec<Installment> = store
            .values()
            .filter(|i| i.loan_id == loan_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.installment_number);
        Ok(rows)
    }

    async fn find_outstanding_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Installment>> {
        let mut rows = self.find_by_loan(loan_id).await?;
        rows.retain(|i| i.is_outstanding());
        Ok(rows)
    }

    async fn update_cas(&self, mut installment: Installment) -> EngineResult<Installment> {
        let mut store = self.installments.lock().unwrap();
        let key = (installment.loan_id, installment.installment_number);
        let current = store
            .get(&key)
            .ok_or_else(|| EngineError::NotFound(format!("installment {key:?}")))?;
        if current.version != installment.version {
            return Err(concurrency_err(
                "Installment",
                installment.id,
                installment.version,
                current.version,
            ));
        }
        installment.version += 1;
        store.insert(key, installment.clone());
        Ok(installment)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn insert(&self, payment: Payment) -> EngineResult<Payment> {
        let mut payments = self.payments.lock().unwrap();
        let mut idem_keys = self.idempotency_keys.lock().unwrap();
        let mut references = self.references.lock().unwrap();
        let key = payment.idempotency_key.as_str().to_string();
        let reference = payment.reference.as_str().to_string();
        if idem_keys.contains_key(&key) {
            return Err(EngineError::Conflict(format!(
                "idempotency key {key} already used by a payment"
            )));
        }
        if references.contains_key(&reference) {
            return Err(EngineError::Conflict(format!(
                "payment reference {reference} already exists"
            )));
        }
        idem_keys.insert(key, payment.id);
        references.insert(reference, payment.id);
        payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn find_by_id(&self, payment_id: Uuid) -> EngineResult<Option<Payment>> {
        Ok(self.payments.lock().unwrap().get(&payment_id).cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> EngineResult<Option<Payment>> {
        let idem_keys = self.idempotency_keys.lock().unwrap();
        Ok(idem_keys
            .get(key)
            .and_then(|id| self.payments.lock().unwrap().get(id).cloned()))
    }

    async fn list_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Payment>> {
        let payments = self.payments.lock().unwrap();
        Ok(payments.values().filter(|p| p.loan_id == loan_id).cloned().collect())
    }

    async fn list_by_account(&self, account_id: Uuid) -> EngineResult<Vec<Payment>> {
        let payments = self.payments.lock().unwrap();
        Ok(payments
            .values()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn update_cas(&self, mut payment: Payment) -> EngineResult<Payment> {
        let mut payments = self.payments.lock().unwrap();
        let current = payments
            .get(&payment.id)
            .ok_or_else(|| EngineError::NotFound(format!("payment {}", payment.id)))?;
        if current.version != payment.version {
            return Err(concurrency_err(
                "Payment",
                payment.id,
                payment.version,
                current.version,
            ));
        }
        payment.version += 1;
        payments.insert(payment.id, payment.clone());
        Ok(payment)
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn find_by_id(&self, account_id: Uuid) -> EngineResult<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(&account_id).cloned())
    }

    async fn list_operators(&self) -> EngineResult<Vec<Account>> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.values().filter(|a| a.is_operator()).cloned().collect())
    }

    async fn update_cas(&self, mut account: Account) -> EngineResult<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        let current = accounts
            .get(&account.id)
            .ok_or_else(|| EngineError::NotFound(format!("account {}", account.id)))?;
        if current.version != account.version {
            return Err(concurrency_err(
                "Account",
                account.id,
                account.version,
                current.version,
            ));
        }
        account.version += 1;
        accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

#[async_trait]
impl AuditLogRepository for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> EngineResult<AuditEntry> {
        self.audit.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn list_by_entity(&self, entity_type: &str, entity_id: Uuid) -> EngineResult<Vec<AuditEntry>> {
        let audit = self.audit.lock().unwrap();
        Ok(audit
            .iter()
            .filter(|e| e.entity_type.as_str() == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IdempotencyRepository for MemoryStore {
    async fn find(&self, key: &str) -> EngineResult<Option<IdempotencyRecord>> {
        Ok(self.idempotency.lock().unwrap().get(key).cloned())
    }

    async fn insert(&self, record: IdempotencyRecord) -> EngineResult<IdempotencyRecord> {
        let mut idempotency = self.idempotency.lock().unwrap();
        let key = record.key.as_str().to_string();
        if idempotency.contains_key(&key) {
            return Err(EngineError::Conflict(format!(
                "idempotency record {key} already exists"
            )));
        }
        idempotency.insert(key, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert(&self, notification: Notification) -> EngineResult<Notification> {
        self.notifications
            .lock()
            .unwrap()
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: Uuid) -> EngineResult<Option<Notification>> {
        Ok(self.notifications.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_account(&self, account_id: Uuid, limit: usize, offset: usize) -> EngineResult<Vec<Notification>> {
        let notifications = self.notifications.lock().unwrap();
        let mut rows: Vec<Notification> = notifications
            .values()
            .filter(|n| n.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn unread_count(&self, account_id: Uuid) -> EngineResult<u64> {
        let notifications = self.notifications.lock().unwrap();
        Ok(notifications
            .values()
            .filter(|n| n.account_id == account_id && n.is_unread())
            .count() as u64)
    }

    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> EngineResult<Notification> {
        let mut notifications = self.notifications.lock().unwrap();
        let notification = notifications
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("notification {id}")))?;
        notification.read_at = Some(read_at);
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, account_id: Uuid, read_at: DateTime<Utc>) -> EngineResult<u64> {
        let mut notifications = self.notifications.lock().unwrap();
        let mut count = 0u64;
        for notification in notifications.values_mut() {
            if notification.account_id == account_id && notification.is_unread() {
                notification.read_at = Some(read_at);
                count += 1;
            }
        }
        Ok(count)
    }
}

impl Store for MemoryStore {
    fn loans(&self) -> &dyn LoanRepository {
        self
    }

    fn installments(&self) -> &dyn InstallmentRepository {
        self
    }

    fn payments(&self) -> &dyn PaymentRepository {
        self
    }

    fn accounts(&self) -> &dyn AccountRepository {
        self
    }

    fn audit_log(&self) -> &dyn AuditLogRepository {
        self
    }

    fn idempotency(&self) -> &dyn IdempotencyRepository {
        self
    }

    fn notifications(&self) -> &dyn NotificationRepository {
        self
    }
}
