//! JSON error responses

use aura_store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code,
            message: message.into(),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

pub fn store_error(err: StoreError) -> ApiError {
    if err.is_not_found() {
        return not_found(err.to_string());
    }
    tracing::error!(error = %err, "store call failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "STORE_ERROR",
        "storage is unavailable",
    )
}
