use super::{
    AccountRepository, AuditLogRepository, IdempotencyRepository, InstallmentRepository,
    LoanRepository, NotificationRepository, PaymentRepository,
};

/// A single logical data store bundling every repository the engine needs
/// (§2, §5: "assumes a single logical data store with compare-and-set
/// semantics"). Modeled on the teacher's `UnitOfWorkSession`, minus
/// explicit transaction `commit`/`rollback` — the engine coordinates
/// exclusively through per-record CAS and unique constraints (§5), never
/// through multi-record ACID transactions, so there is nothing to commit
/// or roll back at the `Store` boundary.
pub trait Store: Send + Sync {
    fn loans(&self) -> &dyn LoanRepository;
    fn installments(&self) -> &dyn InstallmentRepository;
    fn payments(&self) -> &dyn PaymentRepository;
    fn accounts(&self) -> &dyn AccountRepository;
    fn audit_log(&self) -> &dyn AuditLogRepository;
    fn idempotency(&self) -> &dyn IdempotencyRepository;
    fn notifications(&self) -> &dyn NotificationRepository;
}
