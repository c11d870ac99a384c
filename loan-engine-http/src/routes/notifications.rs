use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::Router;
use chrono::Utc;
use loan_engine_api::domain::Notification;
use loan_engine_db::Store;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedAccount;
use crate::envelope::{ApiError, ApiResponse, ApiResult, PageMeta};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/:id/read", patch(mark_read))
        .route("/notifications/read-all", patch(mark_all_read))
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

async fn list_notifications(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Query(page): Query<PageParams>,
) -> ApiResult<Vec<Notification>> {
    let offset = (page.page.saturating_sub(1) * page.limit) as usize;
    let items = state
        .store
        .notifications()
        .list_by_account(caller.account_id, page.limit as usize, offset)
        .await
        .map_err(ApiError::from)?;
    let total = items.len() as u64 + offset as u64;
    let meta = PageMeta {
        page: page.page,
        limit: page.limit,
        total,
        total_pages: total.div_ceil(page.limit.max(1)),
    };
    Ok(ApiResponse::ok_paginated("notifications retrieved", items, meta))
}

async fn unread_count(State(state): State<AppState>, caller: AuthenticatedAccount) -> ApiResult<u64> {
    let count = state
        .store
        .notifications()
        .unread_count(caller.account_id)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("unread count retrieved", count))
}

async fn mark_read(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(id): Path<Uuid>,
) -> ApiResult<Notification> {
    let notification = state
        .store
        .notifications()
        .find_by_id(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(loan_engine_api::error::EngineError::NotFound(format!("notification {id}"))))?;
    if notification.account_id != caller.account_id {
        return Err(ApiError::from(loan_engine_api::error::EngineError::Authorization(
            "notification belongs to a different account".into(),
        )));
    }
    let updated = state
        .store
        .notifications()
        .mark_read(id, Utc::now())
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("notification marked read", updated))
}

async fn mark_all_read(State(state): State<AppState>, caller: AuthenticatedAccount) -> ApiResult<u64> {
    let count = state
        .store
        .notifications()
        .mark_all_read(caller.account_id, Utc::now())
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok("notifications marked read", count))
}
