use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation};
use loan_engine_api::domain::AccountRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::ApiError;
use crate::state::AppState;

/// Bearer token payload (§6: "Authorization: Bearer <token>"). Shaped after
/// the `UserClaims { user_id, email, exp }` the pack's closest example signs
/// with `jsonwebtoken`, narrowed to what route handlers actually need:
/// the account id and its role, so an `Authorization` check never needs a
/// round trip to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub account_id: Uuid,
    pub role: AccountRole,
    pub exp: usize,
}

/// Extracted, verified identity of the caller. Credential issuance and
/// rotation remain an external collaborator (§1); this only verifies the
/// signature and expiry of whatever token the caller presents.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account_id: Uuid,
    pub role: AccountRole,
}

impl AuthenticatedAccount {
    pub fn require_operator(&self) -> Result<(), ApiError> {
        if matches!(self.role, AccountRole::Operator) {
            Ok(())
        } else {
            Err(ApiError::from(loan_engine_api::error::EngineError::Authorization(
                "operator role required".into(),
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::from(loan_engine_api::error::EngineError::Authentication(
                    "missing Authorization header".into(),
                ))
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::from(loan_engine_api::error::EngineError::Authentication(
                "Authorization header must use the Bearer scheme".into(),
            ))
        })?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.token_signing_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            ApiError::from(loan_engine_api::error::EngineError::Authentication(format!(
                "invalid bearer token: {e}"
            )))
        })?;

        Ok(AuthenticatedAccount {
            account_id: decoded.claims.account_id,
            role: decoded.claims.role,
        })
    }
}

/// Extracts the caller-supplied `Idempotency-Key` header required on
/// mutating critical routes (§6). Absence is a validation error, not a
/// silently-generated key — the caller owns retry semantics.
pub fn idempotency_key(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .ok_or_else(|| {
            ApiError::from(loan_engine_api::error::EngineError::Validation {
                field: "Idempotency-Key".into(),
                message: "header is required on this route".into(),
            })
        })
}
