//! Account management and balance query routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tally_core::ledger::BalancePoint;
use tally_db::entities::accounts;
use tally_db::repositories::account::CreateAccountInput;
use tally_db::{AccountRepository, BalanceRepository};
use tally_shared::types::{AccountId, CurrencyCode};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// Creates the account routes (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/{id}", get(get_account).patch(update_account))
        .route("/accounts/{id}/balance", get(balance_as_of))
        .route("/accounts/{id}/history", get(balance_history))
        .route("/accounts/{id}/rebuild", post(rebuild_balances))
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Display name.
    pub name: String,
    /// Native currency of the account.
    pub currency: CurrencyCode,
    /// Opening balance in native minor units.
    #[serde(default)]
    pub initial_balance: i64,
    /// Date the opening balance is valued at (defaults to today).
    pub opened_on: Option<NaiveDate>,
}

/// Request body for updating an account.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    /// Enable or disable the account.
    pub is_enabled: bool,
}

/// An account as returned by the API.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Native currency.
    pub currency: String,
    /// Whether new transactions are accepted.
    pub is_enabled: bool,
    /// Opening balance in native minor units.
    pub initial_balance: i64,
    /// Opening balance in reference-currency minor units.
    pub ref_initial_balance: i64,
    /// Current balance in reference-currency minor units, when computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<i64>,
}

impl AccountResponse {
    fn from_model(model: accounts::Model, current_balance: Option<i64>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            currency: model.currency.trim().to_string(),
            is_enabled: model.is_enabled,
            initial_balance: model.initial_balance,
            ref_initial_balance: model.ref_initial_balance,
            current_balance,
        }
    }
}

/// POST `/accounts` - Create an account.
async fn create_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new(state.conn());
    let model = repo
        .create(CreateAccountInput {
            user_id: auth.user_id,
            name: request.name,
            currency: request.currency,
            initial_balance: request.initial_balance,
            opened_on: request
                .opened_on
                .unwrap_or_else(|| chrono::Utc::now().date_naive()),
        })
        .await?;

    tracing::info!(account_id = %model.id, "account created");
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse::from_model(model, None)),
    ))
}

/// GET `/accounts` - List accounts with current balances.
async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new(state.conn());
    let accounts = repo.list_with_balances(auth.user_id).await?;

    let response: Vec<AccountResponse> = accounts
        .into_iter()
        .map(|entry| AccountResponse::from_model(entry.account, Some(entry.current_balance)))
        .collect();
    Ok(Json(response))
}

/// GET `/accounts/{id}` - Fetch one account with its current balance.
async fn get_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<AccountId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new(state.conn());
    let model = repo.get(auth.user_id, id).await?;

    let balances = BalanceRepository::new(state.conn());
    let current = balances.current(auth.user_id, id).await?;

    Ok(Json(AccountResponse::from_model(model, Some(current))))
}

/// PATCH `/accounts/{id}` - Enable or disable an account.
async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<AccountId>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new(state.conn());
    let model = repo
        .set_enabled(auth.user_id, id, request.is_enabled)
        .await?;
    Ok(Json(AccountResponse::from_model(model, None)))
}

/// Query parameters for a point-in-time balance.
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// End-of-day date to evaluate (defaults to today).
    pub date: Option<NaiveDate>,
}

/// GET `/accounts/{id}/balance` - End-of-day balance on a date.
async fn balance_as_of(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<AccountId>,
    Query(query): Query<BalanceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = query.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let balances = BalanceRepository::new(state.conn());
    let balance = balances.balance_as_of(auth.user_id, id, date).await?;

    Ok(Json(json!({ "date": date, "balance": balance })))
}

/// Query parameters for a balance history range.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Earliest date, inclusive.
    pub from: NaiveDate,
    /// Latest date, inclusive.
    pub to: NaiveDate,
}

/// GET `/accounts/{id}/history` - Daily balance points in a date range.
async fn balance_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<AccountId>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let balances = BalanceRepository::new(state.conn());
    let points: Vec<BalancePoint> = balances
        .history(auth.user_id, id, query.from, query.to)
        .await?;
    Ok(Json(points))
}

/// Query parameters for a balance rebuild.
#[derive(Debug, Deserialize)]
pub struct RebuildQuery {
    /// Rebuild only entries on or after this date; omit for a full rebuild.
    pub from: Option<NaiveDate>,
}

/// POST `/accounts/{id}/rebuild` - Rebuild the balance series from the
/// transaction rows.
async fn rebuild_balances(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<AccountId>,
    Query(query): Query<RebuildQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let balances = BalanceRepository::new(state.conn());
    let entries = match query.from {
        Some(from) => balances.rebuild_from(auth.user_id, id, from).await?,
        None => balances.rebuild(auth.user_id, id).await?,
    };
    Ok(Json(json!({ "entries": entries })))
}
