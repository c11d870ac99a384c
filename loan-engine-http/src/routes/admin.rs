use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use loan_engine_api::domain::{BankDestination, Loan, Payment};
use loan_engine_api::error::EngineError;
use loan_engine_api::service::VerificationDecision;
use loan_engine_db::Store;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{idempotency_key, AuthenticatedAccount};
use crate::envelope::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/loans/:id/review", post(begin_review))
        .route("/admin/loans/:id/approve", post(approve))
        .route("/admin/loans/:id/reject", post(reject))
        .route("/admin/loans/:id/disburse", post(disburse))
        .route("/admin/loans/:id/default", post(mark_defaulted))
        .route("/admin/payments/:id/verify", post(verify_payment))
        .route("/admin/payments/:id/refund", post(refund_full))
        .route("/admin/payments/:id/refund-overpayment", post(refund_overpayment))
}

async fn begin_review(State(state): State<AppState>, caller: AuthenticatedAccount, Path(id): Path<Uuid>) -> ApiResult<Loan> {
    caller.require_operator()?;
    let loan = state.loans.begin_review(id, caller.account_id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok("loan moved to review", loan))
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approved_amount: Decimal,
    pub conditions: Option<String>,
}

async fn approve(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<ApproveRequest>,
) -> ApiResult<Loan> {
    caller.require_operator()?;
    let loan = state
        .loans
        .approve(id, caller.account_id, body.approved_amount, body.conditions)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("loan approved", loan))
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

async fn reject(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<ReasonRequest>,
) -> ApiResult<Loan> {
    caller.require_operator()?;
    let loan = state.loans.reject(id, caller.account_id, body.reason).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok("loan rejected", loan))
}

async fn mark_defaulted(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<ReasonRequest>,
) -> ApiResult<Loan> {
    caller.require_operator()?;
    let loan = state
        .loans
        .mark_defaulted(id, caller.account_id, body.reason)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("loan marked defaulted", loan))
}

#[derive(Debug, Deserialize)]
pub struct DisburseRequest {
    pub account_number: String,
    pub bank_code: String,
}

async fn disburse(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<DisburseRequest>,
) -> ApiResult<Loan> {
    caller.require_operator()?;
    let destination = BankDestination {
        account_number: heapless::String::try_from(body.account_number.as_str())
            .map_err(|_| field_too_long("account_number"))?,
        bank_code: heapless::String::try_from(body.bank_code.as_str()).map_err(|_| field_too_long("bank_code"))?,
    };
    let loan = state
        .disbursement
        .disburse(id, caller.account_id, destination)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("loan disbursed", loan))
}

fn field_too_long(field: &str) -> ApiError {
    ApiError::from(EngineError::Validation {
        field: field.into(),
        message: "too long".into(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum VerifyRequest {
    Success,
    Failed { reason: String },
}

async fn verify_payment(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<VerifyRequest>,
) -> ApiResult<Payment> {
    caller.require_operator()?;
    let decision = match body {
        VerifyRequest::Success => VerificationDecision::Success,
        VerifyRequest::Failed { reason } => VerificationDecision::Failed { reason },
    };
    let payment = state
        .repayment
        .verify_manual_repayment(id, caller.account_id, decision)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("payment verified", payment))
}

async fn refund_full(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Payment> {
    caller.require_operator()?;
    verify_ownership_admin(&state, id).await?;
    let key = idempotency_key(&headers)?;
    let refund = state.refund.clone();
    let account_id = caller.account_id;
    let engine_key = format!("{key}:{id}");
    let payment = state
        .coordinator
        .execute(&key, "/admin/payments/:id/refund", "POST", Some(account_id), move || async move {
            refund.refund_full_payment(id, account_id, &engine_key).await
        })
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("payment refunded", payment))
}

#[derive(Debug, Deserialize)]
pub struct RefundOverpaymentRequest {
    pub amount: Option<Decimal>,
}

async fn refund_overpayment(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RefundOverpaymentRequest>,
) -> ApiResult<Payment> {
    caller.require_operator()?;
    verify_ownership_admin(&state, id).await?;
    let key = idempotency_key(&headers)?;
    let refund = state.refund.clone();
    let account_id = caller.account_id;
    let amount = body.amount;
    let engine_key = format!("{key}:{id}");
    let payment = state
        .coordinator
        .execute(
            &key,
            "/admin/payments/:id/refund-overpayment",
            "POST",
            Some(account_id),
            move || async move { refund.refund_overpayment(id, account_id, &engine_key, amount).await },
        )
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("overpayment refunded", payment))
}

/// An operator may refund any account's payment; this only confirms the
/// payment exists before the protocol's own idempotency/ownership checks run.
async fn verify_ownership_admin(state: &AppState, payment_id: Uuid) -> Result<(), ApiError> {
    let payment = state
        .store
        .payments()
        .find_by_id(payment_id)
        .await
        .map_err(ApiError::from)?;
    if payment.is_none() {
        return Err(ApiError::from(EngineError::NotFound(format!("payment {payment_id}"))));
    }
    Ok(())
}
