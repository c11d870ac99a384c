pub mod coordinator;
pub mod credit;
pub mod disbursement;
pub mod notification_hub;
pub mod payment_provider;
pub mod refund;
pub mod repayment;
pub mod state_machine;

pub use coordinator::Coordinator;
pub use credit::DeterministicCreditScorer;
pub use disbursement::DisbursementProtocolImpl;
pub use notification_hub::NotificationHubImpl;
pub use payment_provider::{HttpPaymentProvider, MockPaymentProvider};
pub use refund::RefundProtocolImpl;
pub use repayment::RepaymentEngineImpl;
pub use state_machine::LoanStateMachineImpl;
