pub mod account_repository;
pub mod audit_repository;
pub mod idempotency_repository;
pub mod installment_repository;
pub mod loan_repository;
pub mod notification_repository;
pub mod payment_repository;

use loan_engine_db::{
    AccountRepository, AuditLogRepository, IdempotencyRepository, InstallmentRepository,
    LoanRepository, NotificationRepository, PaymentRepository, Store,
};

use crate::store::PgStore;

impl Store for PgStore {
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
