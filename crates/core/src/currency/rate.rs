//! Exchange rate types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::CurrencyCode;

/// Exchange rate between two currencies on a given date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Base currency code.
    pub base: CurrencyCode,
    /// Quote currency code.
    pub quote: CurrencyCode,
    /// Exchange rate (1 base = rate quote).
    pub rate: Decimal,
    /// Date this rate is effective.
    pub effective_date: NaiveDate,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    #[must_use]
    pub const fn new(
        base: CurrencyCode,
        quote: CurrencyCode,
        rate: Decimal,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            base,
            quote,
            rate,
            effective_date,
        }
    }

    /// Returns the inverse rate (quote -> base).
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
            rate: Decimal::ONE / self.rate,
            effective_date: self.effective_date,
        }
    }
}
