//! API error responses.
//!
//! Every handler error funnels through [`ApiError`], which renders the
//! domain's error code and message as a JSON body. Database failures are
//! logged server-side and returned as an opaque 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tally_core::ledger::LedgerError;
use tally_db::StoreError;

/// Wrapper turning repository and domain errors into HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(StoreError::Ledger(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            StoreError::Ledger(err) => {
                let status = StatusCode::from_u16(err.http_status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!(error = %err, "internal error");
                }
                (
                    status,
                    Json(json!({
                        "error": err.error_code(),
                        "message": err.to_string(),
                    })),
                )
                    .into_response()
            }
            StoreError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "DATABASE_ERROR",
                        "message": "An internal error occurred",
                    })),
                )
                    .into_response()
            }
        }
    }
}
