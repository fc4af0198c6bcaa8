//! Plain transaction routes.
//!
//! Transfer legs are read-only here; creating or mutating them goes through
//! the transfer routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tally_core::ledger::{
    CreateTransactionInput, TransactionChanges, TransactionKind, TransactionRecord,
};
use tally_db::repositories::ledger::TransactionFilter;
use tally_db::TransactionRepository;
use tally_shared::types::{AccountId, TransactionId};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// Creates the transaction routes (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(create_transaction).get(list_transactions))
        .route(
            "/transactions/{id}",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
}

/// Request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Account to post to.
    pub account_id: AccountId,
    /// Income or expense.
    pub kind: TransactionKind,
    /// Positive magnitude in the account's native minor units.
    pub amount: i64,
    /// Ledger date.
    pub occurred_on: NaiveDate,
    /// Optional note.
    pub note: Option<String>,
    /// Optional link to an external-source record.
    pub external_ref: Option<String>,
}

/// Request body for updating a transaction.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateTransactionRequest {
    /// New positive magnitude.
    pub amount: Option<i64>,
    /// New kind.
    pub kind: Option<TransactionKind>,
    /// Move to a different account.
    pub account_id: Option<AccountId>,
    /// New ledger date.
    pub occurred_on: Option<NaiveDate>,
    /// Replace the note.
    pub note: Option<String>,
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    /// Restrict to one account.
    pub account_id: Option<AccountId>,
    /// Earliest ledger date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest ledger date, inclusive.
    pub to: Option<NaiveDate>,
}

fn repo(state: &AppState) -> TransactionRepository {
    TransactionRepository::new(state.conn(), state.ledger.conflict_retries)
}

/// POST `/transactions` - Create a plain transaction.
async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = repo(&state)
        .create(CreateTransactionInput {
            user_id: auth.user_id,
            account_id: request.account_id,
            kind: request.kind,
            amount: request.amount,
            occurred_on: request.occurred_on,
            note: request.note,
            external_ref: request.external_ref,
        })
        .await?;

    tracing::info!(transaction_id = %record.id, "transaction created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET `/transactions` - List transactions, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records: Vec<TransactionRecord> = repo(&state)
        .list(
            auth.user_id,
            TransactionFilter {
                account_id: query.account_id,
                from: query.from,
                to: query.to,
            },
        )
        .await?;
    Ok(Json(records))
}

/// GET `/transactions/{id}` - Fetch one transaction.
async fn get_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<TransactionId>,
) -> Result<impl IntoResponse, ApiError> {
    let record = repo(&state).get(auth.user_id, id).await?;
    Ok(Json(record))
}

/// PATCH `/transactions/{id}` - Update a plain transaction.
async fn update_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<TransactionId>,
    Json(request): Json<UpdateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = repo(&state)
        .update(
            auth.user_id,
            id,
            TransactionChanges {
                amount: request.amount,
                kind: request.kind,
                account_id: request.account_id,
                occurred_on: request.occurred_on,
                note: request.note,
            },
        )
        .await?;
    Ok(Json(record))
}

/// DELETE `/transactions/{id}` - Delete a plain transaction.
async fn delete_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<TransactionId>,
) -> Result<impl IntoResponse, ApiError> {
    repo(&state).delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
