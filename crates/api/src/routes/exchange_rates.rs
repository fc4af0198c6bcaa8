//! Exchange rate management routes.
//!
//! Rates are manual: when a cross-currency operation fails with
//! `EXCHANGE_RATE_MISSING`, the caller records a rate here and retries.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::ledger::LedgerError;
use tally_db::repositories::exchange_rate::UpsertRateInput;
use tally_db::ExchangeRateRepository;
use tally_shared::types::CurrencyCode;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// Creates the exchange rate routes (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/exchange-rates", put(upsert_rate).get(get_rate))
}

/// Request body for recording a rate.
#[derive(Debug, Deserialize)]
pub struct UpsertRateRequest {
    /// Base currency (1 base = `rate` quote).
    pub base: CurrencyCode,
    /// Quote currency.
    pub quote: CurrencyCode,
    /// Positive conversion rate.
    pub rate: Decimal,
    /// The date the rate takes effect.
    pub effective_date: NaiveDate,
}

/// Query parameters for a rate lookup.
#[derive(Debug, Deserialize)]
pub struct RateQuery {
    /// Base currency.
    pub base: CurrencyCode,
    /// Quote currency.
    pub quote: CurrencyCode,
    /// Lookup date (defaults to today).
    pub date: Option<NaiveDate>,
}

/// A stored or derived rate.
#[derive(Debug, Serialize)]
pub struct RateResponse {
    /// Base currency.
    pub base: CurrencyCode,
    /// Quote currency.
    pub quote: CurrencyCode,
    /// Conversion rate, serialized as a decimal string.
    pub rate: Decimal,
    /// The date the lookup was evaluated at.
    pub date: NaiveDate,
}

/// PUT `/exchange-rates` - Record or replace a manual rate.
async fn upsert_rate(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<UpsertRateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = ExchangeRateRepository::new(state.conn());
    let model = repo
        .upsert(UpsertRateInput {
            base: request.base.clone(),
            quote: request.quote.clone(),
            rate: request.rate,
            effective_date: request.effective_date,
        })
        .await?;

    tracing::info!(
        base = %request.base,
        quote = %request.quote,
        date = %request.effective_date,
        "exchange rate recorded"
    );
    Ok((
        StatusCode::OK,
        Json(RateResponse {
            base: request.base,
            quote: request.quote,
            rate: model.rate,
            date: model.effective_date,
        }),
    ))
}

/// GET `/exchange-rates` - Look up the effective rate for a pair on a date.
async fn get_rate(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<RateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = query.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let repo = ExchangeRateRepository::new(state.conn());

    let Some(rate) = repo.find_rate(&query.base, &query.quote, date).await? else {
        return Err(LedgerError::ExchangeRateMissing {
            from: query.base.to_string(),
            to: query.quote.to_string(),
            date,
        }
        .into());
    };

    Ok(Json(RateResponse {
        base: query.base,
        quote: query.quote,
        rate,
        date,
    }))
}
