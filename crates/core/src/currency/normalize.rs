//! Minor-unit currency conversion.
//!
//! CRITICAL: conversion truncates toward zero, never rounds. Fractional
//! minor units are discarded so that `5.95 -> 5` and `-5.95 -> -5`; the
//! magnitude of a converted amount never grows. Truncation is deterministic:
//! converting the same input with the same rate always yields the same
//! result, which the balance reconciliation invariant depends on.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Converts an integer minor-unit amount using the given exchange rate,
/// truncating toward zero.
///
/// Returns `None` when the converted value does not fit in `i64`; callers
/// treat that as an arithmetic overflow error.
#[must_use]
pub fn convert_minor(amount_minor: i64, rate: Decimal) -> Option<i64> {
    (Decimal::from(amount_minor).checked_mul(rate)?)
        .trunc()
        .to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_identity_rate_is_lossless() {
        assert_eq!(convert_minor(12345, Decimal::ONE), Some(12345));
        assert_eq!(convert_minor(-12345, Decimal::ONE), Some(-12345));
        assert_eq!(convert_minor(0, Decimal::ONE), Some(0));
    }

    #[test]
    fn test_truncates_toward_zero_positive() {
        // 100 * 0.0595 = 5.95 -> 5
        assert_eq!(convert_minor(100, dec!(0.0595)), Some(5));
    }

    #[test]
    fn test_truncates_toward_zero_negative() {
        // -100 * 0.0595 = -5.95 -> -5, not -6 (toward zero, not floor)
        assert_eq!(convert_minor(-100, dec!(0.0595)), Some(-5));
    }

    #[test]
    fn test_whole_results_unchanged() {
        assert_eq!(convert_minor(200, dec!(1.5)), Some(300));
        assert_eq!(convert_minor(-200, dec!(1.5)), Some(-300));
    }

    #[test]
    fn test_small_amount_truncates_to_zero() {
        assert_eq!(convert_minor(1, dec!(0.5)), Some(0));
        assert_eq!(convert_minor(-1, dec!(0.5)), Some(0));
    }

    #[test]
    fn test_overflow_is_detected() {
        assert_eq!(convert_minor(i64::MAX, dec!(2)), None);
    }
}
