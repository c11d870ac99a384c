pub mod credit;
pub mod disbursement;
pub mod notification_hub;
pub mod payment_provider;
pub mod refund;
pub mod repayment;
pub mod state_machine;

pub use credit::*;
pub use disbursement::*;
pub use notification_hub::*;
pub use payment_provider::*;
pub use refund::*;
pub use repayment::*;
pub use state_machine::*;
