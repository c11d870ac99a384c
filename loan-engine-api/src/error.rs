use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::LoanStatus;

pub type EngineResult<T> = Result<T, EngineError>;

/// Error taxonomy for the loan lifecycle engine.
///
/// Each variant carries the identifiers a caller needs to decide how to
/// react (retry, surface to the user, escalate) without inspecting a raw
/// database or provider error.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum EngineError {
    #[error("validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("illegal transition from {from:?} to {to:?}")]
    InvalidTransition { from: LoanStatus, to: LoanStatus },

    #[error("account {account_id} already has an active loan {existing_loan_id}")]
    ActiveLoanExists {
        account_id: Uuid,
        existing_loan_id: Uuid,
    },

    #[error("loan {loan_id} already has a disbursement on record")]
    AlreadyDisbursed { loan_id: Uuid },

    #[error("loan {loan_id} is not owned by account {account_id}")]
    NotOwned { loan_id: Uuid, account_id: Uuid },

    #[error("loan {loan_id} is not active")]
    NotActive { loan_id: Uuid },

    #[error(
        "concurrency conflict updating {entity} {id}: expected version {expected_version}, found {actual_version}"
    )]
    Concurrency {
        entity: String,
        id: Uuid,
        expected_version: i64,
        actual_version: i64,
    },

    #[error("idempotency key {key} is already in flight")]
    IdempotencyInFlight { key: String },

    #[error("payment {payment_id} has already been refunded")]
    AlreadyRefunded { payment_id: Uuid },

    #[error("payment provider failure: {message}")]
    ProviderFailure { message: String, retryable: bool },

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Coarse category, useful for a transport layer mapping to status codes
    /// (§7 of the lifecycle spec) without the engine knowing about HTTP.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Authentication(_) => "authentication",
            Self::Authorization(_) => "authorization",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ActiveLoanExists { .. } => "active_loan_exists",
            Self::AlreadyDisbursed { .. } => "already_disbursed",
            Self::NotOwned { .. } => "not_owned",
            Self::NotActive { .. } => "not_active",
            Self::Concurrency { .. } => "concurrency",
            Self::IdempotencyInFlight { .. } => "idempotency_in_flight",
            Self::AlreadyRefunded { .. } => "already_refunded",
            Self::ProviderFailure { .. } => "provider_failure",
            Self::Internal(_) => "internal",
        }
    }

    pub fn is_retryable_concurrency(&self) -> bool {
        matches!(self, Self::Concurrency { .. })
    }
}
