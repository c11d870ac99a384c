use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use loan_engine_api::service::CreditAdvisory;
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedAccount;
use crate::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/credit/report", get(report))
        .route("/credit/check", post(check))
}

#[derive(Debug, Serialize)]
struct CreditReport {
    score: u16,
    recommend_approval: bool,
}

impl From<CreditAdvisory> for CreditReport {
    fn from(advisory: CreditAdvisory) -> Self {
        Self {
            score: advisory.score,
            recommend_approval: advisory.recommend_approval,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreditCheckRequest {
    #[serde(default)]
    identifier_verified: bool,
}

/// Advisory only (§9/§1): never gates loan creation, always returns 200.
async fn report(State(state): State<AppState>, caller: AuthenticatedAccount) -> ApiResult<CreditReport> {
    let advisory = state.credit.score(caller.account_id, true).await;
    Ok(ApiResponse::ok("credit report retrieved", advisory.into()))
}

async fn check(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Json(body): Json<CreditCheckRequest>,
) -> ApiResult<CreditReport> {
    let advisory = state.credit.score(caller.account_id, body.identifier_verified).await;
    Ok(ApiResponse::ok("credit check complete", advisory.into()))
}
