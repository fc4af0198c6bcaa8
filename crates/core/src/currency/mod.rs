//! Reference-currency normalization and exchange rates.

pub mod normalize;
pub mod rate;

pub use normalize::convert_minor;
pub use rate::ExchangeRate;

#[cfg(test)]
mod props;
