use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::debug;

use crate::axum_http::error_responses::error_body;

pub async fn not_found() -> impl IntoResponse {
    debug!("router: not_found handler invoked");
    error_body(StatusCode::NOT_FOUND, "Not found")
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
