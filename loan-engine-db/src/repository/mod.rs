pub mod account_repository;
pub mod audit_repository;
pub mod idempotency_repository;
pub mod installment_repository;
pub mod loan_repository;
pub mod notification_repository;
pub mod payment_repository;
pub mod store;

pub use account_repository::*;
pub use audit_repository::*;
pub use idempotency_repository::*;
pub use installment_repository::*;
pub use loan_repository::*;
pub use notification_repository::*;
pub use payment_repository::*;
pub use store::*;
