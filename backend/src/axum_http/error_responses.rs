use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::usecases::{
    admin_auth::AdminAuthError, checkout::CheckoutError, orders::OrderAdminError,
    payment_reconciliation::ReconciliationError,
};

/// Every error leaves the API as `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

// Internal variants carry their cause as a `#[source]`, so `to_string()` never
// leaks database or Stripe details to the client.

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        error_body(self.status_code(), self.to_string())
    }
}

impl IntoResponse for ReconciliationError {
    fn into_response(self) -> Response {
        error_body(self.status_code(), self.to_string())
    }
}

impl IntoResponse for OrderAdminError {
    fn into_response(self) -> Response {
        error_body(self.status_code(), self.to_string())
    }
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        error_body(self.status_code(), self.to_string())
    }
}
