//! Refund link routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tally_db::RefundRepository;
use tally_shared::types::TransactionId;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// Creates the refund link routes (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/refund-links", post(create_link).delete(remove_link))
        .route("/transactions/{id}/refund-links", get(list_links))
}

/// Request body naming the two transactions to link or unlink.
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    /// The original transaction (typically the expense).
    pub original_id: TransactionId,
    /// The refunding transaction (typically the income).
    pub refund_id: TransactionId,
}

/// A stored refund link.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    /// Link ID.
    pub id: uuid::Uuid,
    /// Smaller transaction ID of the pair.
    pub first_transaction_id: uuid::Uuid,
    /// Larger transaction ID of the pair.
    pub second_transaction_id: uuid::Uuid,
}

/// POST `/refund-links` - Link two transactions as original and refund.
async fn create_link(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<LinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = RefundRepository::new(state.conn());
    let link = repo
        .link(auth.user_id, request.original_id, request.refund_id)
        .await?;

    tracing::info!(link_id = %link.id, "refund link created");
    Ok((
        StatusCode::CREATED,
        Json(LinkResponse {
            id: link.id,
            first_transaction_id: link.first_transaction_id,
            second_transaction_id: link.second_transaction_id,
        }),
    ))
}

/// DELETE `/refund-links` - Remove the link between two transactions.
///
/// Idempotent: unlinking an unlinked pair succeeds and reports
/// `removed: false`.
async fn remove_link(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<LinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = RefundRepository::new(state.conn());
    let removed = repo
        .unlink(auth.user_id, request.original_id, request.refund_id)
        .await?;
    Ok(Json(json!({ "removed": removed })))
}

/// GET `/transactions/{id}/refund-links` - Transactions linked to this one.
async fn list_links(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<TransactionId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = RefundRepository::new(state.conn());
    let linked: Vec<TransactionId> = repo.links_for(auth.user_id, id).await?;
    Ok(Json(linked))
}
