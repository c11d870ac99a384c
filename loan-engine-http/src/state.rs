use std::sync::Arc;

use loan_engine_api::service::{CreditScorer, DisbursementProtocol, LoanStateMachine, NotificationHub, RefundProtocol, RepaymentEngine};
use loan_engine_db::Store;
use loan_engine_logic::services::Coordinator;

/// Shared application state handed to every route handler, mirroring the
/// `AppState { db_pool, start_time }` shape the pack's closest HTTP example
/// wires through `axum`/`actix` extractors. Every field here is a trait
/// object so the binary that assembles this struct is the only place that
/// picks concrete implementations (`PgStore`, `HttpPaymentProvider`, ...).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub coordinator: Arc<Coordinator>,
    pub loans: Arc<dyn LoanStateMachine>,
    pub disbursement: Arc<dyn DisbursementProtocol>,
    pub repayment: Arc<dyn RepaymentEngine>,
    pub refund: Arc<dyn RefundProtocol>,
    pub credit: Arc<dyn CreditScorer>,
    pub notifications: Arc<dyn NotificationHub>,
    pub token_signing_secret: Arc<str>,
}
