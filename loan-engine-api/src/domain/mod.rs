pub mod account;
pub mod audit;
pub mod idempotency;
pub mod installment;
pub mod loan;
pub mod money;
pub mod notification;
pub mod payment;

pub use account::*;
pub use audit::*;
pub use idempotency::*;
pub use installment::*;
pub use loan::*;
pub use money::*;
pub use notification::*;
pub use payment::*;
