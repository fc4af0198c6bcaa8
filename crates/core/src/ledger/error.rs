//! Ledger error types for validation, consistency, and state errors.
//!
//! This module defines all errors that can occur during ledger operations,
//! including input validation errors, currency normalization errors,
//! transfer pairing errors, refund link errors, and concurrency errors.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction amount cannot be zero.
    #[error("Transaction amount cannot be zero")]
    ZeroAmount,

    /// Transaction amount must be a positive magnitude.
    #[error("Transaction amount must be positive")]
    NegativeAmount,

    /// Converted amount does not fit in integer minor units.
    #[error("Amount overflows integer minor units")]
    AmountOverflow,

    /// Account is disabled and cannot accept transactions.
    #[error("Account {0} is disabled")]
    AccountDisabled(Uuid),

    /// Transfer legs must be on the account's native currency path; plain
    /// transactions cannot carry the transfer kind.
    #[error("Transfer transactions must be created through the transfer engine")]
    TransferKindOnPlainPath,

    // ========== Not Found Errors ==========
    /// Account not found or not owned by the caller.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Transaction not found or not owned by the caller.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Transfer not found or not owned by the caller.
    #[error("Transfer not found: {0}")]
    TransferNotFound(Uuid),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    // ========== Currency Errors ==========
    /// Exchange rates must be strictly positive.
    #[error("Exchange rate must be positive")]
    NonPositiveRate,

    /// An exchange rate needs two distinct currencies.
    #[error("Base and quote currencies must be different")]
    SameCurrencyRate,

    /// No usable exchange rate on or before the requested date.
    #[error("No exchange rate found for {from} to {to} on or before {date}")]
    ExchangeRateMissing {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
        /// Date for which the rate was requested.
        date: NaiveDate,
    },

    // ========== Transfer Errors ==========
    /// Attempt to mutate one leg of a transfer through the plain ledger path.
    #[error("Transaction {0} is a transfer leg and must be mutated through the transfer engine")]
    TransferBoundary(Uuid),

    /// Source and destination accounts of a transfer must differ.
    #[error("Cannot transfer from an account to itself")]
    SelfTransfer,

    // ========== Refund Link Errors ==========
    /// Transactions are already linked as original/refund.
    #[error("Transactions {0} and {1} are already linked")]
    AlreadyLinked(Uuid, Uuid),

    /// A transaction cannot be linked to itself.
    #[error("A transaction cannot be its own refund")]
    SelfRefundLink,

    /// Both sides of a refund link must belong to the acting user.
    #[error("Transaction {0} does not belong to the acting user")]
    CrossUser(Uuid),

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected by the storage serialization check.
    #[error("Concurrent modification detected, please retry")]
    ConsistencyConflict,

    // ========== Infrastructure Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AccountDisabled(_) => "ACCOUNT_DISABLED",
            Self::TransferKindOnPlainPath => "TRANSFER_KIND_ON_PLAIN_PATH",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::NonPositiveRate => "NON_POSITIVE_RATE",
            Self::SameCurrencyRate => "SAME_CURRENCY_RATE",
            Self::ExchangeRateMissing { .. } => "EXCHANGE_RATE_MISSING",
            Self::TransferBoundary(_) => "TRANSFER_BOUNDARY",
            Self::SelfTransfer => "SELF_TRANSFER",
            Self::AlreadyLinked(..) => "ALREADY_LINKED",
            Self::SelfRefundLink => "SELF_REFUND_LINK",
            Self::CrossUser(_) => "CROSS_USER",
            Self::ConsistencyConflict => "CONSISTENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation and caller integration errors
            Self::ZeroAmount
            | Self::NegativeAmount
            | Self::AmountOverflow
            | Self::AccountDisabled(_)
            | Self::TransferKindOnPlainPath
            | Self::TransferBoundary(_)
            | Self::SelfTransfer
            | Self::SelfRefundLink
            | Self::NonPositiveRate
            | Self::SameCurrencyRate => 400,

            // 403 Forbidden - ownership violations
            Self::CrossUser(_) => 403,

            // 404 Not Found
            Self::AccountNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::TransferNotFound(_)
            | Self::UserNotFound(_) => 404,

            // 409 Conflict
            Self::AlreadyLinked(..) | Self::ConsistencyConflict => 409,

            // 422 - the caller can supply a manual rate and retry
            Self::ExchangeRateMissing { .. } => 422,

            // 500 Internal Server Error
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if the whole operation should be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConsistencyConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::ZeroAmount.error_code(), "ZERO_AMOUNT");
        assert_eq!(LedgerError::SelfTransfer.error_code(), "SELF_TRANSFER");
        assert_eq!(
            LedgerError::TransferBoundary(Uuid::nil()).error_code(),
            "TRANSFER_BOUNDARY"
        );
        assert_eq!(
            LedgerError::ExchangeRateMissing {
                from: "USD".to_string(),
                to: "EUR".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            }
            .error_code(),
            "EXCHANGE_RATE_MISSING"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::ZeroAmount.http_status_code(), 400);
        assert_eq!(LedgerError::CrossUser(Uuid::nil()).http_status_code(), 403);
        assert_eq!(
            LedgerError::TransactionNotFound(Uuid::nil()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::AlreadyLinked(Uuid::nil(), Uuid::nil()).http_status_code(),
            409
        );
        assert_eq!(LedgerError::ConsistencyConflict.http_status_code(), 409);
        assert_eq!(
            LedgerError::ExchangeRateMissing {
                from: "USD".to_string(),
                to: "EUR".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            LedgerError::Database("test".to_string()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConsistencyConflict.is_retryable());
        assert!(!LedgerError::ZeroAmount.is_retryable());
        assert!(!LedgerError::TransferBoundary(Uuid::nil()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::ExchangeRateMissing {
            from: "USD".to_string(),
            to: "EUR".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "No exchange rate found for USD to EUR on or before 2026-02-01"
        );
    }
}
