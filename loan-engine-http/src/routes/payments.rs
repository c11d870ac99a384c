use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use loan_engine_api::domain::{ManualProofBundle, Payment};
use loan_engine_db::Store;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{idempotency_key, AuthenticatedAccount};
use crate::envelope::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments/manual", post(submit_manual))
        .route("/payments/manual-with-receipt", post(submit_manual))
        .route("/payments", axum::routing::get(list_payments))
}

#[derive(Debug, Deserialize)]
pub struct ManualRepaymentRequest {
    pub loan_id: Uuid,
    pub amount: Decimal,
    pub sender_bank: String,
    pub sender_name: String,
    pub transfer_date: NaiveDate,
    pub external_reference: String,
    pub evidence_url: String,
}

async fn submit_manual(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    headers: HeaderMap,
    Json(body): Json<ManualRepaymentRequest>,
) -> ApiResult<Payment> {
    let key = idempotency_key(&headers)?;
    let proof = ManualProofBundle {
        sender_bank: heapless::String::try_from(body.sender_bank.as_str())
            .map_err(|_| field_too_long("sender_bank"))?,
        sender_name: heapless::String::try_from(body.sender_name.as_str())
            .map_err(|_| field_too_long("sender_name"))?,
        transfer_date: body.transfer_date,
        external_reference: heapless::String::try_from(body.external_reference.as_str())
            .map_err(|_| field_too_long("external_reference"))?,
        evidence_url: heapless::String::try_from(body.evidence_url.as_str())
            .map_err(|_| field_too_long("evidence_url"))?,
    };

    let repayment = state.repayment.clone();
    let account_id = caller.account_id;
    let loan_id = body.loan_id;
    let amount = body.amount;
    let engine_key = format!("{key}:{loan_id}");
    let payment = state
        .coordinator
        .execute(&key, "/payments/manual", "POST", Some(account_id), move || async move {
            repayment
                .submit_manual_repayment(loan_id, account_id, amount, &engine_key, proof)
                .await
        })
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("manual repayment proof submitted", payment))
}

fn field_too_long(field: &str) -> ApiError {
    ApiError::from(loan_engine_api::error::EngineError::Validation {
        field: field.into(),
        message: "too long".into(),
    })
}

async fn list_payments(State(state): State<AppState>, caller: AuthenticatedAccount) -> ApiResult<Vec<Payment>> {
    let payments = state
        .store
        .payments()
        .list_by_account(caller.account_id)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("payments retrieved", payments))
}
