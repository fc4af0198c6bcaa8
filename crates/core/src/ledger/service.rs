//! Ledger service for transaction resolution.
//!
//! This module provides the core business logic for validating a transaction
//! mutation and deriving its balance side-effects before anything is
//! persisted. The service is pure: rate lookup is injected as a closure and
//! persistence happens elsewhere, so every rule here is testable without a
//! database.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, CurrencyCode};

use super::error::LedgerError;
use super::types::{
    AccountSnapshot, CreateTransactionInput, ResolvedTransaction, TransactionChanges,
    TransactionKind, TransactionRecord,
};
use super::validation::{
    guard_plain_mutation, validate_account, validate_magnitude, validate_plain_kind,
};
use crate::currency::convert_minor;

/// One balance side-effect: add `ref_amount` to an account's timeline from
/// `date` forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    /// The account whose timeline shifts.
    pub account_id: AccountId,
    /// The date the shift starts.
    pub date: NaiveDate,
    /// Signed reference-currency delta.
    pub ref_amount: i64,
}

/// The derived effect of updating a transaction: reverse the old posting,
/// then apply the new one. Both deltas must commit atomically with the row
/// update.
#[derive(Debug, Clone)]
pub struct UpdateEffect {
    /// Undo of the old balance effect.
    pub reversal: BalanceDelta,
    /// The new balance effect.
    pub application: BalanceDelta,
    /// New signed native amount.
    pub amount: i64,
    /// New signed reference amount.
    pub ref_amount: i64,
    /// New kind.
    pub kind: TransactionKind,
    /// New ledger date.
    pub occurred_on: NaiveDate,
}

/// Stateless ledger resolution service.
pub struct LedgerService;

impl LedgerService {
    /// Converts a signed native-currency amount into the user's reference
    /// currency at `date`.
    ///
    /// Same currency is the zero-cost path: no lookup, amount unchanged.
    /// Otherwise the injected lookup must supply the most recent rate on or
    /// before `date`; absence is a hard `ExchangeRateMissing` failure, never
    /// a silent 1:1 fallback.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateMissing` when no rate is available and
    /// `AmountOverflow` when the converted value leaves `i64` range.
    pub fn normalize<F>(
        amount: i64,
        currency: &CurrencyCode,
        reference: &CurrencyCode,
        date: NaiveDate,
        rate_lookup: F,
    ) -> Result<i64, LedgerError>
    where
        F: Fn(&CurrencyCode, &CurrencyCode, NaiveDate) -> Option<Decimal>,
    {
        if currency == reference {
            return Ok(amount);
        }

        let rate = rate_lookup(currency, reference, date).ok_or_else(|| {
            LedgerError::ExchangeRateMissing {
                from: currency.to_string(),
                to: reference.to_string(),
                date,
            }
        })?;

        convert_minor(amount, rate).ok_or(LedgerError::AmountOverflow)
    }

    /// Validates and resolves a new plain transaction.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if validation or normalization fails; nothing
    /// is resolved partially.
    pub fn resolve_new<F>(
        input: &CreateTransactionInput,
        account: &AccountSnapshot,
        reference: &CurrencyCode,
        rate_lookup: F,
    ) -> Result<ResolvedTransaction, LedgerError>
    where
        F: Fn(&CurrencyCode, &CurrencyCode, NaiveDate) -> Option<Decimal>,
    {
        validate_plain_kind(input.kind)?;
        validate_magnitude(input.amount)?;
        validate_account(account, input.user_id)?;

        let amount = input.kind.signed(input.amount);
        let ref_amount = Self::normalize(
            amount,
            &account.currency,
            reference,
            input.occurred_on,
            rate_lookup,
        )?;

        Ok(ResolvedTransaction {
            user_id: input.user_id,
            account_id: input.account_id,
            amount,
            ref_amount,
            kind: input.kind,
            occurred_on: input.occurred_on,
            transfer_id: None,
            external_ref: input.external_ref.clone(),
            note: input.note.clone(),
        })
    }

    /// Validates and resolves an update to an existing plain transaction,
    /// deriving the reverse-then-reapply balance effect.
    ///
    /// `account` is the target account after the change (which may differ
    /// from `existing.account_id` when the transaction moves).
    ///
    /// # Errors
    ///
    /// Returns `TransferBoundary` for transfer legs and the usual validation
    /// and normalization errors otherwise.
    pub fn resolve_update<F>(
        existing: &TransactionRecord,
        changes: &TransactionChanges,
        account: &AccountSnapshot,
        reference: &CurrencyCode,
        rate_lookup: F,
    ) -> Result<UpdateEffect, LedgerError>
    where
        F: Fn(&CurrencyCode, &CurrencyCode, NaiveDate) -> Option<Decimal>,
    {
        guard_plain_mutation(existing)?;

        let kind = changes.kind.unwrap_or(existing.kind);
        validate_plain_kind(kind)?;

        let magnitude = changes.amount.unwrap_or_else(|| existing.amount.abs());
        validate_magnitude(magnitude)?;
        validate_account(account, existing.user_id)?;

        let occurred_on = changes.occurred_on.unwrap_or(existing.occurred_on);
        let amount = kind.signed(magnitude);
        let ref_amount = Self::normalize(
            amount,
            &account.currency,
            reference,
            occurred_on,
            rate_lookup,
        )?;

        Ok(UpdateEffect {
            reversal: BalanceDelta {
                account_id: existing.account_id,
                date: existing.occurred_on,
                ref_amount: -existing.ref_amount,
            },
            application: BalanceDelta {
                account_id: account.id,
                date: occurred_on,
                ref_amount,
            },
            amount,
            ref_amount,
            kind,
            occurred_on,
        })
    }

    /// Validates deletion of a plain transaction and derives the reversal
    /// delta.
    ///
    /// # Errors
    ///
    /// Returns `TransferBoundary` for transfer legs; those go through the
    /// transfer engine's guarded path.
    pub fn resolve_delete(existing: &TransactionRecord) -> Result<BalanceDelta, LedgerError> {
        guard_plain_mutation(existing)?;
        Ok(BalanceDelta {
            account_id: existing.account_id,
            date: existing.occurred_on,
            ref_amount: -existing.ref_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_shared::types::{TransactionId, TransferId, UserId};

    fn usd() -> CurrencyCode {
        CurrencyCode::parse("USD").unwrap()
    }

    fn eur() -> CurrencyCode {
        CurrencyCode::parse("EUR").unwrap()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
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

    fn create_input(user_id: UserId, account_id: AccountId) -> CreateTransactionInput {
        CreateTransactionInput {
            user_id,
            account_id,
            kind: TransactionKind::Expense,
            amount: 1500,
            occurred_on: date(1, 15),
            note: Some("groceries".to_string()),
            external_ref: None,
        }
    }

    fn no_rate(_: &CurrencyCode, _: &CurrencyCode, _: NaiveDate) -> Option<Decimal> {
        None
    }

    #[test]
    fn test_resolve_new_same_currency_skips_lookup() {
        let user = UserId::new();
        let acct = account(user, usd());
        let input = create_input(user, acct.id);

        // lookup returning None proves the identity path never consults it
        let resolved = LedgerService::resolve_new(&input, &acct, &usd(), no_rate).unwrap();

        assert_eq!(resolved.amount, -1500);
        assert_eq!(resolved.ref_amount, -1500);
        assert_eq!(resolved.kind, TransactionKind::Expense);
        assert!(resolved.transfer_id.is_none());
    }

    #[test]
    fn test_resolve_new_cross_currency_normalizes() {
        let user = UserId::new();
        let acct = account(user, eur());
        let mut input = create_input(user, acct.id);
        input.kind = TransactionKind::Income;

        let resolved =
            LedgerService::resolve_new(&input, &acct, &usd(), |_, _, _| Some(dec!(1.1))).unwrap();

        assert_eq!(resolved.amount, 1500);
        // 1500 * 1.1 = 1650, exact
        assert_eq!(resolved.ref_amount, 1650);
    }

    #[test]
    fn test_resolve_new_truncates_ref_amount_toward_zero() {
        let user = UserId::new();
        let acct = account(user, eur());
        let input = create_input(user, acct.id);

        let resolved =
            LedgerService::resolve_new(&input, &acct, &usd(), |_, _, _| Some(dec!(1.0001)))
                .unwrap();

        // -1500 * 1.0001 = -1500.15 -> -1500 (toward zero)
        assert_eq!(resolved.ref_amount, -1500);
    }

    #[test]
    fn test_resolve_new_missing_rate_fails() {
        let user = UserId::new();
        let acct = account(user, eur());
        let input = create_input(user, acct.id);

        let result = LedgerService::resolve_new(&input, &acct, &usd(), no_rate);
        assert!(matches!(
            result,
            Err(LedgerError::ExchangeRateMissing { .. })
        ));
    }

    #[test]
    fn test_resolve_new_rejects_zero_amount() {
        let user = UserId::new();
        let acct = account(user, usd());
        let mut input = create_input(user, acct.id);
        input.amount = 0;

        assert!(matches!(
            LedgerService::resolve_new(&input, &acct, &usd(), no_rate),
            Err(LedgerError::ZeroAmount)
        ));
    }

    #[test]
    fn test_resolve_new_rejects_transfer_kind() {
        let user = UserId::new();
        let acct = account(user, usd());
        let mut input = create_input(user, acct.id);
        input.kind = TransactionKind::Transfer;

        assert!(matches!(
            LedgerService::resolve_new(&input, &acct, &usd(), no_rate),
            Err(LedgerError::TransferKindOnPlainPath)
        ));
    }

    #[test]
    fn test_resolve_new_rejects_disabled_account() {
        let user = UserId::new();
        let mut acct = account(user, usd());
        acct.is_enabled = false;
        let input = create_input(user, acct.id);

        assert!(matches!(
            LedgerService::resolve_new(&input, &acct, &usd(), no_rate),
            Err(LedgerError::AccountDisabled(_))
        ));
    }

    fn existing(user: UserId, acct: &AccountSnapshot) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::new(),
            user_id: user,
            account_id: acct.id,
            amount: -1500,
            ref_amount: -1500,
            kind: TransactionKind::Expense,
            occurred_on: date(1, 10),
            transfer_id: None,
            external_ref: None,
            note: None,
        }
    }

    #[test]
    fn test_resolve_update_derives_reverse_then_reapply() {
        let user = UserId::new();
        let acct = account(user, usd());
        let record = existing(user, &acct);

        let changes = TransactionChanges {
            amount: Some(2000),
            occurred_on: Some(date(1, 20)),
            ..Default::default()
        };
        let effect =
            LedgerService::resolve_update(&record, &changes, &acct, &usd(), no_rate).unwrap();

        assert_eq!(effect.reversal.account_id, acct.id);
        assert_eq!(effect.reversal.date, date(1, 10));
        assert_eq!(effect.reversal.ref_amount, 1500);

        assert_eq!(effect.application.account_id, acct.id);
        assert_eq!(effect.application.date, date(1, 20));
        assert_eq!(effect.application.ref_amount, -2000);

        assert_eq!(effect.amount, -2000);
        assert_eq!(effect.kind, TransactionKind::Expense);
    }

    #[test]
    fn test_resolve_update_moving_accounts_targets_both() {
        let user = UserId::new();
        let old_acct = account(user, usd());
        let new_acct = account(user, usd());
        let record = existing(user, &old_acct);

        let changes = TransactionChanges {
            account_id: Some(new_acct.id),
            ..Default::default()
        };
        let effect =
            LedgerService::resolve_update(&record, &changes, &new_acct, &usd(), no_rate).unwrap();

        assert_eq!(effect.reversal.account_id, old_acct.id);
        assert_eq!(effect.application.account_id, new_acct.id);
        assert_eq!(effect.reversal.ref_amount, 1500);
        assert_eq!(effect.application.ref_amount, -1500);
    }

    #[test]
    fn test_resolve_update_kind_flip_flips_sign() {
        let user = UserId::new();
        let acct = account(user, usd());
        let record = existing(user, &acct);

        let changes = TransactionChanges {
            kind: Some(TransactionKind::Income),
            ..Default::default()
        };
        let effect =
            LedgerService::resolve_update(&record, &changes, &acct, &usd(), no_rate).unwrap();

        assert_eq!(effect.amount, 1500);
        assert_eq!(effect.application.ref_amount, 1500);
    }

    #[test]
    fn test_resolve_update_rejects_transfer_leg() {
        let user = UserId::new();
        let acct = account(user, usd());
        let mut record = existing(user, &acct);
        record.transfer_id = Some(TransferId::new());

        let result = LedgerService::resolve_update(
            &record,
            &TransactionChanges::default(),
            &acct,
            &usd(),
            no_rate,
        );
        assert!(matches!(result, Err(LedgerError::TransferBoundary(_))));
    }

    #[test]
    fn test_resolve_delete_reverses_effect() {
        let user = UserId::new();
        let acct = account(user, usd());
        let record = existing(user, &acct);

        let delta = LedgerService::resolve_delete(&record).unwrap();
        assert_eq!(delta.account_id, acct.id);
        assert_eq!(delta.date, date(1, 10));
        assert_eq!(delta.ref_amount, 1500);
    }

    #[test]
    fn test_resolve_delete_rejects_transfer_leg() {
        let user = UserId::new();
        let acct = account(user, usd());
        let mut record = existing(user, &acct);
        record.transfer_id = Some(TransferId::new());

        assert!(matches!(
            LedgerService::resolve_delete(&record),
            Err(LedgerError::TransferBoundary(_))
        ));
    }
}
