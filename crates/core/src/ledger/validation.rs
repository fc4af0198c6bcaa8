//! Business rule validation for ledger mutations.
//!
//! All checks here are fail-fast: they run before any write is attempted,
//! so a rejected operation leaves no partial state.

use tally_shared::types::UserId;

use super::error::LedgerError;
use super::types::{AccountSnapshot, TransactionKind, TransactionRecord};

/// Validates a transaction magnitude: must be a positive, non-zero integer.
pub fn validate_magnitude(amount: i64) -> Result<(), LedgerError> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    if amount < 0 {
        return Err(LedgerError::NegativeAmount);
    }
    Ok(())
}

/// Validates that an account can accept a posting from the acting user.
///
/// Ownership failures surface as `AccountNotFound` so that callers cannot
/// distinguish other users' accounts from nonexistent ones.
pub fn validate_account(account: &AccountSnapshot, user_id: UserId) -> Result<(), LedgerError> {
    if account.user_id != user_id {
        return Err(LedgerError::AccountNotFound(account.id.into_inner()));
    }
    if !account.is_enabled {
        return Err(LedgerError::AccountDisabled(account.id.into_inner()));
    }
    Ok(())
}

/// Rejects the transfer kind on the plain create path.
pub fn validate_plain_kind(kind: TransactionKind) -> Result<(), LedgerError> {
    if kind.is_transfer() {
        return Err(LedgerError::TransferKindOnPlainPath);
    }
    Ok(())
}

/// Guards the plain update/delete path against transfer legs.
///
/// Mutating one leg without its pair would orphan the other, so transfer
/// legs are only reachable through the transfer engine.
pub fn guard_plain_mutation(record: &TransactionRecord) -> Result<(), LedgerError> {
    if record.transfer_id.is_some() {
        return Err(LedgerError::TransferBoundary(record.id.into_inner()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_shared::types::{AccountId, CurrencyCode, TransactionId, TransferId};

    fn account(user_id: UserId, enabled: bool) -> AccountSnapshot {
        AccountSnapshot {
            id: AccountId::new(),
            user_id,
            currency: CurrencyCode::parse("USD").unwrap(),
            is_enabled: enabled,
            ref_initial_balance: 0,
        }
    }

    fn record(transfer_id: Option<TransferId>) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::new(),
            user_id: UserId::new(),
            account_id: AccountId::new(),
            amount: -1500,
            ref_amount: -1500,
            kind: TransactionKind::Expense,
            occurred_on: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            transfer_id,
            external_ref: None,
            note: None,
        }
    }

    #[test]
    fn test_magnitude_rejects_zero() {
        assert!(matches!(validate_magnitude(0), Err(LedgerError::ZeroAmount)));
    }

    #[test]
    fn test_magnitude_rejects_negative() {
        assert!(matches!(
            validate_magnitude(-100),
            Err(LedgerError::NegativeAmount)
        ));
    }

    #[test]
    fn test_magnitude_accepts_positive() {
        assert!(validate_magnitude(1).is_ok());
        assert!(validate_magnitude(1_000_000).is_ok());
    }

    #[test]
    fn test_account_ownership_hides_as_not_found() {
        let user = UserId::new();
        let other = account(UserId::new(), true);
        assert!(matches!(
            validate_account(&other, user),
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_disabled_account_rejected() {
        let user = UserId::new();
        let acct = account(user, false);
        assert!(matches!(
            validate_account(&acct, user),
            Err(LedgerError::AccountDisabled(_))
        ));
    }

    #[test]
    fn test_enabled_owned_account_accepted() {
        let user = UserId::new();
        let acct = account(user, true);
        assert!(validate_account(&acct, user).is_ok());
    }

    #[test]
    fn test_plain_kind_rejects_transfer() {
        assert!(matches!(
            validate_plain_kind(TransactionKind::Transfer),
            Err(LedgerError::TransferKindOnPlainPath)
        ));
        assert!(validate_plain_kind(TransactionKind::Income).is_ok());
        assert!(validate_plain_kind(TransactionKind::Expense).is_ok());
    }

    #[test]
    fn test_transfer_leg_blocked_on_plain_path() {
        let leg = record(Some(TransferId::new()));
        assert!(matches!(
            guard_plain_mutation(&leg),
            Err(LedgerError::TransferBoundary(_))
        ));
    }

    #[test]
    fn test_plain_transaction_passes_guard() {
        assert!(guard_plain_mutation(&record(None)).is_ok());
    }
}
