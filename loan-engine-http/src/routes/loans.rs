use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use loan_engine_api::domain::Loan;
use loan_engine_api::error::EngineError;
use loan_engine_db::Store;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{idempotency_key, AuthenticatedAccount};
use crate::envelope::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/loans", post(submit_loan).get(list_loans))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/history", get(get_history))
        .route("/loans/:id/schedule", get(get_schedule))
        .route("/loans/:id/payments", get(get_payments))
        .route("/loans/:id/disbursement", get(get_disbursement))
        .route("/loans/:id/repay", post(repay))
}

async fn owned_loan(state: &AppState, caller: &AuthenticatedAccount, loan_id: Uuid) -> Result<Loan, ApiError> {
    let loan = state
        .store
        .loans()
        .find_by_id(loan_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))?;
    if loan.borrower_id != caller.account_id && !matches!(caller.role, loan_engine_api::domain::AccountRole::Operator) {
        return Err(EngineError::NotOwned {
            loan_id,
            account_id: caller.account_id,
        }
        .into());
    }
    Ok(loan)
}

#[derive(Debug, Deserialize)]
pub struct SubmitLoanRequest {
    pub purpose: String,
    pub annual_interest_rate: Decimal,
    pub requested_amount: Decimal,
    pub tenor_months: u32,
}

async fn submit_loan(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Json(body): Json<SubmitLoanRequest>,
) -> ApiResult<Loan> {
    let loan = state
        .loans
        .submit_loan(
            caller.account_id,
            &body.purpose,
            body.annual_interest_rate,
            body.requested_amount,
            body.tenor_months,
        )
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("loan submitted", loan))
}

async fn list_loans(State(state): State<AppState>, caller: AuthenticatedAccount) -> ApiResult<Vec<Loan>> {
    let loans = state
        .store
        .loans()
        .list_by_borrower(caller.account_id)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("loans retrieved", loans))
}

async fn get_loan(State(state): State<AppState>, caller: AuthenticatedAccount, Path(id): Path<Uuid>) -> ApiResult<Loan> {
    let loan = owned_loan(&state, &caller, id).await?;
    Ok(ApiResponse::ok("loan retrieved", loan))
}

async fn get_history(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<loan_engine_api::domain::LoanStatusChange>> {
    let loan = owned_loan(&state, &caller, id).await?;
    Ok(ApiResponse::ok("loan history retrieved", loan.status_history))
}

async fn get_schedule(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<loan_engine_api::domain::Installment>> {
    owned_loan(&state, &caller, id).await?;
    let installments = state.store.installments().find_by_loan(id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok("repayment schedule retrieved", installments))
}

async fn get_payments(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<loan_engine_api::domain::Payment>> {
    owned_loan(&state, &caller, id).await?;
    let payments = state.store.payments().list_by_loan(id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok("payments retrieved", payments))
}

async fn get_disbursement(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
) -> ApiResult<Option<loan_engine_api::domain::LoanDisbursement>> {
    let loan = owned_loan(&state, &caller, id).await?;
    Ok(ApiResponse::ok("disbursement retrieved", loan.disbursement))
}

#[derive(Debug, Deserialize)]
pub struct RepayRequest {
    pub amount: Decimal,
}

async fn repay(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<RepayRequest>,
) -> ApiResult<loan_engine_api::domain::RepaymentOutcome> {
    let key = idempotency_key(&headers)?;
    let repayment = state.repayment.clone();
    let account_id = caller.account_id;
    let amount = payload.amount;
    let engine_key = key_for_engine(&key, id);
    let outcome = state
        .coordinator
        .execute(&key, "/loans/:id/repay", "POST", Some(account_id), move || async move {
            repayment.process_repayment(id, account_id, amount, &engine_key).await
        })
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("repayment processed", outcome))
}

/// Nests the caller-supplied transport key inside the domain-level key so a
/// retried `Idempotency-Key` and `Payment.idempotency_key` (spec §3) never
/// diverge for the same logical repayment attempt, while two distinct
/// transport keys against the same loan never collide.
fn key_for_engine(transport_key: &str, loan_id: Uuid) -> String {
    format!("{transport_key}:{loan_id}")
}
