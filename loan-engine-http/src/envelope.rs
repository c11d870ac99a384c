use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use loan_engine_api::error::EngineError;
use serde::Serialize;

/// Wire shape from spec §6: `{success, message, data?, meta?, errors?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta: None,
            errors: None,
        }
    }

    pub fn ok_paginated(message: impl Into<String>, data: T, meta: PageMeta) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta: Some(meta),
            errors: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Wraps an `EngineError` for rejection from extractors and handlers, so the
/// same envelope shape covers both success and failure paths (§7: "all
/// errors land in the envelope with `success=false`").
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

/// Status code mapping per §7's propagation policy.
fn status_code_for(error: &EngineError) -> StatusCode {
    match error.kind() {
        "validation" | "invalid_transition" | "active_loan_exists" | "already_disbursed" | "not_owned" | "not_active" => {
            StatusCode::BAD_REQUEST
        }
        "authentication" => StatusCode::UNAUTHORIZED,
        "authorization" => StatusCode::FORBIDDEN,
        "not_found" => StatusCode::NOT_FOUND,
        "conflict" | "concurrency" | "idempotency_in_flight" | "already_refunded" => StatusCode::CONFLICT,
        "provider_failure" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code_for(&self.0);
        let errors = if let EngineError::Validation { field, message } = &self.0 {
            Some(vec![FieldError {
                field: field.clone(),
                message: message.clone(),
            }])
        } else {
            None
        };
        let body = ApiResponse::<()> {
            success: false,
            message: self.0.to_string(),
            data: None,
            meta: None,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
