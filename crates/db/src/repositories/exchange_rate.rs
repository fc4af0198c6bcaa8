//! Exchange rate repository.
//!
//! Rates are stored one-directional per (base, quote, effective_date).
//! Lookups walk back to the most recent rate on or before the requested
//! date and fall back to inverting the opposite direction when the direct
//! pair is absent.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use tally_shared::types::CurrencyCode;
use uuid::Uuid;

use super::StoreError;
use crate::entities::exchange_rates;
use tally_core::currency::ExchangeRate;
use tally_core::ledger::LedgerError;

/// Input for recording a manual exchange rate.
#[derive(Debug, Clone)]
pub struct UpsertRateInput {
    /// Base currency (1 base = `rate` quote).
    pub base: CurrencyCode,
    /// Quote currency.
    pub quote: CurrencyCode,
    /// Positive conversion rate.
    pub rate: Decimal,
    /// The date the rate takes effect.
    pub effective_date: NaiveDate,
}

/// Exchange rate repository for manual rate management and lookups.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    db: DatabaseConnection,
}

impl ExchangeRateRepository {
    /// Creates a new exchange rate repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates or updates the rate for a (base, quote, date) triple.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveRate` or `SameCurrencyRate` on invalid input and
    /// a database error if persistence fails.
    pub async fn upsert(&self, input: UpsertRateInput) -> Result<exchange_rates::Model, StoreError> {
        if input.rate <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveRate.into());
        }
        if input.base == input.quote {
            return Err(LedgerError::SameCurrencyRate.into());
        }

        let existing = exchange_rates::Entity::find()
            .filter(exchange_rates::Column::BaseCurrency.eq(input.base.as_str()))
            .filter(exchange_rates::Column::QuoteCurrency.eq(input.quote.as_str()))
            .filter(exchange_rates::Column::EffectiveDate.eq(input.effective_date))
            .one(&self.db)
            .await?;

        let now = chrono::Utc::now().into();

        if let Some(model) = existing {
            let mut active: exchange_rates::ActiveModel = model.into();
            active.rate = Set(input.rate);
            active.updated_at = Set(now);
            Ok(active.update(&self.db).await?)
        } else {
            let active = exchange_rates::ActiveModel {
                id: Set(Uuid::now_v7()),
                base_currency: Set(input.base.to_string()),
                quote_currency: Set(input.quote.to_string()),
                rate: Set(input.rate),
                effective_date: Set(input.effective_date),
                created_at: Set(now),
                updated_at: Set(now),
            };
            Ok(active.insert(&self.db).await?)
        }
    }

    /// Lists all rates for a currency pair, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_pair(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<Vec<exchange_rates::Model>, StoreError> {
        let rates = exchange_rates::Entity::find()
            .filter(exchange_rates::Column::BaseCurrency.eq(base.as_str()))
            .filter(exchange_rates::Column::QuoteCurrency.eq(quote.as_str()))
            .order_by_desc(exchange_rates::Column::EffectiveDate)
            .all(&self.db)
            .await?;
        Ok(rates)
    }

    /// Looks up the conversion rate for `base` to `quote` effective on
    /// `date`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_rate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, StoreError> {
        Ok(find_rate_on(&self.db, base, quote, date).await?)
    }
}

/// Finds the conversion rate for `base` to `quote` on or before `date`.
///
/// Tries the direct pair first. When only the opposite direction is stored,
/// the rate is inverted. Identity pairs always resolve to 1.
pub(crate) async fn find_rate_on<C: ConnectionTrait>(
    conn: &C,
    base: &CurrencyCode,
    quote: &CurrencyCode,
    date: NaiveDate,
) -> Result<Option<Decimal>, DbErr> {
    if base == quote {
        return Ok(Some(Decimal::ONE));
    }

    if let Some(direct) = find_direct(conn, base, quote, date).await? {
        return Ok(Some(direct.rate));
    }

    if let Some(opposite) = find_direct(conn, quote, base, date).await? {
        if opposite.rate > Decimal::ZERO {
            return Ok(Some(opposite.inverse().rate));
        }
    }

    Ok(None)
}

async fn find_direct<C: ConnectionTrait>(
    conn: &C,
    base: &CurrencyCode,
    quote: &CurrencyCode,
    date: NaiveDate,
) -> Result<Option<ExchangeRate>, DbErr> {
    let found = exchange_rates::Entity::find()
        .filter(exchange_rates::Column::BaseCurrency.eq(base.as_str()))
        .filter(exchange_rates::Column::QuoteCurrency.eq(quote.as_str()))
        .filter(exchange_rates::Column::EffectiveDate.lte(date))
        .order_by_desc(exchange_rates::Column::EffectiveDate)
        .one(conn)
        .await?;
    Ok(found.map(|model| {
        ExchangeRate::new(
            base.clone(),
            quote.clone(),
            model.rate,
            model.effective_date,
        )
    }))
}
