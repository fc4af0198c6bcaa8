//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations, hiding
//! the `SeaORM` implementation details from the rest of the application.
//! Domain rules live in `tally-core`; repositories fetch state, call into
//! the core, and persist the result inside a single database transaction.

pub mod account;
pub mod balance;
pub mod exchange_rate;
pub mod ledger;
pub mod refund;
pub mod session;
pub mod transfer;
pub mod user;

pub use account::{AccountRepository, AccountWithBalance, CreateAccountInput};
pub use balance::BalanceRepository;
pub use exchange_rate::{ExchangeRateRepository, UpsertRateInput};
pub use ledger::{TransactionFilter, TransactionRepository};
pub use refund::RefundRepository;
pub use session::{IssuedSession, SessionRepository};
pub use transfer::{TransferChanges, TransferRecord, TransferRepository};
pub use user::{CreateUserInput, UserRepository};

use sea_orm::DbErr;
use tally_core::ledger::LedgerError;

/// Error type for all repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl StoreError {
    /// Returns true if retrying the whole transaction may succeed.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Ledger(err) => err.is_retryable(),
            Self::Database(err) => is_serialization_failure(err),
        }
    }

    /// Maps database-level serialization failures to the domain's
    /// `ConsistencyConflict` so callers see one conflict error.
    #[must_use]
    pub fn normalize_conflict(self) -> Self {
        match self {
            Self::Database(err) if is_serialization_failure(&err) => {
                Self::Ledger(LedgerError::ConsistencyConflict)
            }
            other => other,
        }
    }
}

/// Detects Postgres serialization failures and deadlocks, which are safe to
/// retry as a fresh transaction.
#[must_use]
pub fn is_serialization_failure(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("could not serialize") || message.contains("deadlock detected")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        let conflict = StoreError::Ledger(LedgerError::ConsistencyConflict);
        assert!(conflict.is_conflict());

        let domain = StoreError::Ledger(LedgerError::ZeroAmount);
        assert!(!domain.is_conflict());

        let serialization = StoreError::Database(DbErr::Custom(
            "could not serialize access due to concurrent update".to_string(),
        ));
        assert!(serialization.is_conflict());

        let deadlock =
            StoreError::Database(DbErr::Custom("deadlock detected".to_string()));
        assert!(deadlock.is_conflict());
    }

    #[test]
    fn test_normalize_conflict_maps_serialization_failures() {
        let err = StoreError::Database(DbErr::Custom(
            "could not serialize access due to concurrent update".to_string(),
        ));
        assert!(matches!(
            err.normalize_conflict(),
            StoreError::Ledger(LedgerError::ConsistencyConflict)
        ));

        let other = StoreError::Database(DbErr::Custom("relation missing".to_string()));
        assert!(matches!(other.normalize_conflict(), StoreError::Database(_)));
    }
}
