use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{admin, credit, loans, notifications, payments};
use crate::state::AppState;

/// Assembles the route table of spec §6 onto a shared `AppState`. CORS is
/// wired wide-open here because the origin allow-list itself is the
/// excluded collaborator (§6 "Environment: ... origin allow-list") — a real
/// deployment replaces `CorsLayer::permissive()` with one built from
/// `EngineConfig::allowed_origins`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(loans::router())
        .merge(payments::router())
        .merge(notifications::router())
        .merge(credit::router())
        .merge(admin::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
