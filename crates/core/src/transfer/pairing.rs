//! Transfer planning: turning one transfer request into a matched pair of
//! ledger legs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, CurrencyCode, TransferId, UserId};

use crate::currency::convert_minor;
use crate::ledger::error::LedgerError;
use crate::ledger::service::LedgerService;
use crate::ledger::types::{AccountSnapshot, ResolvedTransaction, TransactionKind};
use crate::ledger::validation::{validate_account, validate_magnitude};

/// Input for creating a transfer between two accounts of the same user.
#[derive(Debug, Clone)]
pub struct TransferInput {
    /// The acting user.
    pub user_id: UserId,
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

/// A fully resolved transfer: two legs sharing one transfer ID, ready to
/// persist atomically.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    /// The shared transfer ID both legs carry.
    pub transfer_id: TransferId,
    /// Outgoing leg, negative amount on the source account.
    pub source: ResolvedTransaction,
    /// Incoming leg, positive amount on the destination account.
    pub destination: ResolvedTransaction,
}

/// Returns the two account IDs in canonical lock order (ascending).
///
/// Every multi-account mutation locks in this order so two concurrent
/// transfers touching the same pair cannot deadlock.
#[must_use]
pub fn lock_order(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Plans a transfer: validates both accounts, converts the magnitude into
/// the destination currency, and normalizes each leg independently into the
/// reference currency.
///
/// The destination leg receives the source magnitude converted at the
/// source-to-destination rate on `occurred_on`. Because each leg's reference
/// amount is truncated separately, the two legs may not cancel to exactly
/// zero in reference units; the ledger treats that residue as conversion
/// cost, not an error.
///
/// # Errors
///
/// Returns `SelfTransfer` when source and destination are the same account,
/// plus the usual validation, rate-lookup, and overflow errors.
pub fn plan_transfer<F>(
    input: &TransferInput,
    from: &AccountSnapshot,
    to: &AccountSnapshot,
    reference: &CurrencyCode,
    transfer_id: TransferId,
    rate_lookup: F,
) -> Result<TransferPlan, LedgerError>
where
    F: Fn(&CurrencyCode, &CurrencyCode, NaiveDate) -> Option<Decimal>,
{
    if input.from_account_id == input.to_account_id {
        return Err(LedgerError::SelfTransfer);
    }
    validate_magnitude(input.amount)?;
    validate_account(from, input.user_id)?;
    validate_account(to, input.user_id)?;

    let incoming = if from.currency == to.currency {
        input.amount
    } else {
        let rate = rate_lookup(&from.currency, &to.currency, input.occurred_on).ok_or_else(
            || LedgerError::ExchangeRateMissing {
                from: from.currency.to_string(),
                to: to.currency.to_string(),
                date: input.occurred_on,
            },
        )?;
        convert_minor(input.amount, rate).ok_or(LedgerError::AmountOverflow)?
    };
    // A sub-unit rate can truncate the incoming leg to nothing; the ledger
    // never stores zero-amount rows.
    if incoming == 0 {
        return Err(LedgerError::ZeroAmount);
    }

    let source_amount = input
        .amount
        .checked_neg()
        .ok_or(LedgerError::AmountOverflow)?;
    let source_ref = LedgerService::normalize(
        source_amount,
        &from.currency,
        reference,
        input.occurred_on,
        &rate_lookup,
    )?;
    let dest_ref = LedgerService::normalize(
        incoming,
        &to.currency,
        reference,
        input.occurred_on,
        &rate_lookup,
    )?;

    let source = ResolvedTransaction {
        user_id: input.user_id,
        account_id: input.from_account_id,
        amount: source_amount,
        ref_amount: source_ref,
        kind: TransactionKind::Transfer,
        occurred_on: input.occurred_on,
        transfer_id: Some(transfer_id),
        external_ref: None,
        note: input.note.clone(),
    };
    let destination = ResolvedTransaction {
        user_id: input.user_id,
        account_id: input.to_account_id,
        amount: incoming,
        ref_amount: dest_ref,
        kind: TransactionKind::Transfer,
        occurred_on: input.occurred_on,
        transfer_id: Some(transfer_id),
        external_ref: None,
        note: input.note.clone(),
    };

    Ok(TransferPlan {
        transfer_id,
        source,
        destination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        CurrencyCode::parse("USD").unwrap()
    }

    fn eur() -> CurrencyCode {
        CurrencyCode::parse("EUR").unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn account(user_id: UserId, currency: CurrencyCode) -> AccountSnapshot {
        AccountSnapshot {
            id: AccountId::new(),
            user_id,
            currency,
            is_enabled: true,
            ref_initial_balance: 0,
        }
    }

    fn input(user_id: UserId, from: AccountId, to: AccountId, amount: i64) -> TransferInput {
        TransferInput {
            user_id,
            from_account_id: from,
            to_account_id: to,
            amount,
            occurred_on: date(),
            note: None,
        }
    }

    fn no_rate(_: &CurrencyCode, _: &CurrencyCode, _: NaiveDate) -> Option<Decimal> {
        None
    }

    #[test]
    fn test_same_currency_legs_mirror_each_other() {
        let user = UserId::new();
        let from = account(user, usd());
        let to = account(user, usd());
        let input = input(user, from.id, to.id, 5000);

        let plan =
            plan_transfer(&input, &from, &to, &usd(), TransferId::new(), no_rate).unwrap();

        assert_eq!(plan.source.amount, -5000);
        assert_eq!(plan.destination.amount, 5000);
        assert_eq!(plan.source.ref_amount, -5000);
        assert_eq!(plan.destination.ref_amount, 5000);
        assert_eq!(plan.source.transfer_id, Some(plan.transfer_id));
        assert_eq!(plan.destination.transfer_id, Some(plan.transfer_id));
        assert_eq!(plan.source.kind, TransactionKind::Transfer);
        assert_eq!(plan.destination.kind, TransactionKind::Transfer);
    }

    #[test]
    fn test_cross_currency_converts_destination_leg() {
        let user = UserId::new();
        let from = account(user, usd());
        let to = account(user, eur());
        let input = input(user, from.id, to.id, 10000);

        // USD -> EUR at 0.92; EUR -> USD (reference) at 1.0869...
        let lookup = |base: &CurrencyCode, quote: &CurrencyCode, _: NaiveDate| {
            if base.as_str() == "USD" && quote.as_str() == "EUR" {
                Some(dec!(0.92))
            } else if base.as_str() == "EUR" && quote.as_str() == "USD" {
                Some(dec!(1.086956))
            } else {
                None
            }
        };
        let plan = plan_transfer(&input, &from, &to, &usd(), TransferId::new(), lookup).unwrap();

        // 10000 USD cents -> 9200 EUR cents
        assert_eq!(plan.destination.amount, 9200);
        // source is already in the reference currency
        assert_eq!(plan.source.ref_amount, -10000);
        // 9200 * 1.086956 = 9999.9952 -> 9999 (toward zero); the 1-cent
        // residue is conversion cost
        assert_eq!(plan.destination.ref_amount, 9999);
    }

    #[test]
    fn test_destination_leg_truncating_to_zero_rejected() {
        let user = UserId::new();
        let from = account(user, CurrencyCode::parse("IDR").unwrap());
        let to = account(user, usd());
        let input = input(user, from.id, to.id, 100);

        // 100 IDR minor units at 0.0000625 truncates to 0 USD minor units
        let lookup = |_: &CurrencyCode, _: &CurrencyCode, _: NaiveDate| Some(dec!(0.0000625));
        let result = plan_transfer(&input, &from, &to, &usd(), TransferId::new(), lookup);
        assert!(matches!(result, Err(LedgerError::ZeroAmount)));
    }

    #[test]
    fn test_self_transfer_rejected() {
        let user = UserId::new();
        let from = account(user, usd());
        let input = input(user, from.id, from.id, 100);

        let result =
            plan_transfer(&input, &from, &from, &usd(), TransferId::new(), no_rate);
        assert!(matches!(result, Err(LedgerError::SelfTransfer)));
    }

    #[test]
    fn test_missing_conversion_rate_rejected() {
        let user = UserId::new();
        let from = account(user, usd());
        let to = account(user, eur());
        let input = input(user, from.id, to.id, 100);

        let result = plan_transfer(&input, &from, &to, &usd(), TransferId::new(), no_rate);
        assert!(matches!(
            result,
            Err(LedgerError::ExchangeRateMissing { .. })
        ));
    }

    #[test]
    fn test_disabled_destination_rejected() {
        let user = UserId::new();
        let from = account(user, usd());
        let mut to = account(user, usd());
        to.is_enabled = false;
        let input = input(user, from.id, to.id, 100);

        let result = plan_transfer(&input, &from, &to, &usd(), TransferId::new(), no_rate);
        assert!(matches!(result, Err(LedgerError::AccountDisabled(_))));
    }

    #[test]
    fn test_foreign_account_concealed_as_not_found() {
        let user = UserId::new();
        let from = account(user, usd());
        let to = account(UserId::new(), usd());
        let input = input(user, from.id, to.id, 100);

        let result = plan_transfer(&input, &from, &to, &usd(), TransferId::new(), no_rate);
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let user = UserId::new();
        let from = account(user, usd());
        let to = account(user, usd());
        let input = input(user, from.id, to.id, 0);

        let result = plan_transfer(&input, &from, &to, &usd(), TransferId::new(), no_rate);
        assert!(matches!(result, Err(LedgerError::ZeroAmount)));
    }

    #[test]
    fn test_lock_order_is_ascending_and_symmetric() {
        let a = AccountId::new();
        let b = AccountId::new();
        let (first, second) = lock_order(a, b);
        assert!(first <= second);
        assert_eq!(lock_order(a, b), lock_order(b, a));
        assert_eq!(lock_order(a, a), (a, a));
    }
}
