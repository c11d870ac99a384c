use chrono::Utc;
use heapless::String as HeaplessString;
use loan_engine_api::domain::{Loan, LoanStatus, LoanStatusChange};
use uuid::Uuid;

/// Append a `LoanStatusChange` and move `loan.status` to `to`. Shared by
/// every protocol that drives a loan transition, so `statusHistory` is
/// always written the same way (§4.2: "every transition appends to
/// statusHistory... and emits one AuditEntry").
pub fn push_history(loan: &mut Loan, from: LoanStatus, to: LoanStatus, reason: Option<&str>, performed_by: Uuid) {
    loan.status_history.push(LoanStatusChange {
        from,
        to,
        reason: reason.and_then(|r| HeaplessString::try_from(r).ok()),
        performed_by,
        at: Utc::now(),
    });
    loan.status = to;
    loan.updated_at = Utc::now();
}
