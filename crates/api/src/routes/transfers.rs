//! Transfer routes: the only write surface for transfer legs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_core::ledger::TransactionRecord;
use tally_core::transfer::TransferInput;
use tally_db::repositories::transfer::{TransferChanges, TransferRecord};
use tally_db::TransferRepository;
use tally_shared::types::{AccountId, TransferId};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// Creates the transfer routes (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", post(create_transfer))
        .route(
            "/transfers/{id}",
            get(get_transfer).patch(update_transfer).delete(delete_transfer),
        )
}

/// Request body for creating a transfer.
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    /// Source account.
    pub from_account_id: AccountId,
    /// Destination account.
    pub to_account_id: AccountId,
    /// Positive magnitude in the source account's native minor units.
    pub amount: i64,
    /// Ledger date for both legs.
    pub occurred_on: NaiveDate,
    /// Optional note, copied to both legs.
    pub note: Option<String>,
}

/// Request body for updating a transfer.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateTransferRequest {
    /// New positive magnitude.
    pub amount: Option<i64>,
    /// New ledger date for both legs.
    pub occurred_on: Option<NaiveDate>,
    /// Replace the note on both legs.
    pub note: Option<String>,
}

/// A transfer as returned by the API.
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    /// The shared transfer ID.
    pub transfer_id: TransferId,
    /// Outgoing leg.
    pub source: TransactionRecord,
    /// Incoming leg.
    pub destination: TransactionRecord,
}

impl From<TransferRecord> for TransferResponse {
    fn from(record: TransferRecord) -> Self {
        Self {
            transfer_id: record.transfer_id,
            source: record.source,
            destination: record.destination,
        }
    }
}

fn repo(state: &AppState) -> TransferRepository {
    TransferRepository::new(state.conn(), state.ledger.conflict_retries)
}

/// POST `/transfers` - Create a transfer.
async fn create_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateTransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = repo(&state)
        .create(TransferInput {
            user_id: auth.user_id,
            from_account_id: request.from_account_id,
            to_account_id: request.to_account_id,
            amount: request.amount,
            occurred_on: request.occurred_on,
            note: request.note,
        })
        .await?;

    tracing::info!(transfer_id = %record.transfer_id, "transfer created");
    Ok((StatusCode::CREATED, Json(TransferResponse::from(record))))
}

/// GET `/transfers/{id}` - Fetch both legs of a transfer.
async fn get_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<TransferId>,
) -> Result<impl IntoResponse, ApiError> {
    let record = repo(&state).get(auth.user_id, id).await?;
    Ok(Json(TransferResponse::from(record)))
}

/// PATCH `/transfers/{id}` - Update a transfer, re-deriving both legs.
async fn update_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<TransferId>,
    Json(request): Json<UpdateTransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = repo(&state)
        .update(
            auth.user_id,
            id,
            TransferChanges {
                amount: request.amount,
                occurred_on: request.occurred_on,
                note: request.note,
            },
        )
        .await?;
    Ok(Json(TransferResponse::from(record)))
}

/// DELETE `/transfers/{id}` - Delete both legs of a transfer.
async fn delete_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<TransferId>,
) -> Result<impl IntoResponse, ApiError> {
    repo(&state).delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
