//! Property tests for minor-unit conversion.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::normalize::convert_minor;

/// Strategy for realistic minor-unit amounts.
fn amount_strategy() -> impl Strategy<Value = i64> {
    -1_000_000_000_000i64..1_000_000_000_000i64
}

/// Strategy for positive exchange rates with up to 6 decimal places.
fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 6))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Conversion is deterministic: same inputs always produce the same output.
    #[test]
    fn prop_conversion_deterministic(
        amount in amount_strategy(),
        rate in rate_strategy(),
    ) {
        prop_assert_eq!(convert_minor(amount, rate), convert_minor(amount, rate));
    }

    /// The result sign matches the input sign (or is zero).
    #[test]
    fn prop_sign_preserved(
        amount in amount_strategy(),
        rate in rate_strategy(),
    ) {
        let converted = convert_minor(amount, rate).unwrap();
        if converted != 0 {
            prop_assert_eq!(converted.signum(), amount.signum());
        }
    }

    /// Truncation never increases magnitude relative to the exact product.
    #[test]
    fn prop_truncation_toward_zero(
        amount in amount_strategy(),
        rate in rate_strategy(),
    ) {
        let exact = Decimal::from(amount) * rate;
        let converted = Decimal::from(convert_minor(amount, rate).unwrap());
        prop_assert!(converted.abs() <= exact.abs());
        // and discards strictly less than one whole minor unit
        prop_assert!((exact - converted).abs() < Decimal::ONE);
    }

    /// The identity rate never changes an amount.
    #[test]
    fn prop_identity_rate_lossless(amount in amount_strategy()) {
        prop_assert_eq!(convert_minor(amount, Decimal::ONE), Some(amount));
    }

    /// Converting zero always yields zero.
    #[test]
    fn prop_zero_converts_to_zero(rate in rate_strategy()) {
        prop_assert_eq!(convert_minor(0, rate), Some(0));
    }

    /// `convert_minor` agrees with `Decimal::trunc` + `to_i64` on the exact product.
    #[test]
    fn prop_matches_decimal_trunc(
        amount in amount_strategy(),
        rate in rate_strategy(),
    ) {
        let expected = (Decimal::from(amount) * rate).trunc().to_i64();
        prop_assert_eq!(convert_minor(amount, rate), expected);
    }
}
