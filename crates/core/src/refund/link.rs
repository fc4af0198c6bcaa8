//! Refund link validation.
//!
//! A refund link is an informational association between two transactions of
//! the same user, typically an expense and the income that refunds it. Links
//! never change amounts or balances.

use tally_shared::types::{TransactionId, UserId};

use crate::ledger::error::LedgerError;
use crate::ledger::types::TransactionRecord;

/// An unordered pair of linked transaction IDs.
///
/// `(a, b)` and `(b, a)` are the same link; the constructor stores the
/// smaller ID first so equality and uniqueness checks are order-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefundPair {
    first: TransactionId,
    second: TransactionId,
}

impl RefundPair {
    /// Builds the canonical pair for two transaction IDs.
    #[must_use]
    pub fn new(a: TransactionId, b: TransactionId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// The smaller ID of the pair.
    #[must_use]
    pub const fn first(&self) -> TransactionId {
        self.first
    }

    /// The larger ID of the pair.
    #[must_use]
    pub const fn second(&self) -> TransactionId {
        self.second
    }

    /// Returns true if `id` is either side of the pair.
    #[must_use]
    pub fn contains(&self, id: TransactionId) -> bool {
        self.first == id || self.second == id
    }
}

/// Validates that `original` and `refund` may be linked by `user_id`.
///
/// `existing` holds the pairs already recorded for either transaction.
///
/// # Errors
///
/// Returns `SelfRefundLink` when both sides are the same transaction,
/// `CrossUser` when either transaction belongs to another user, and
/// `AlreadyLinked` when the pair is already recorded.
pub fn validate_link(
    original: &TransactionRecord,
    refund: &TransactionRecord,
    user_id: UserId,
    existing: &[RefundPair],
) -> Result<RefundPair, LedgerError> {
    if original.id == refund.id {
        return Err(LedgerError::SelfRefundLink);
    }
    if original.user_id != user_id {
        return Err(LedgerError::CrossUser(original.id.into_inner()));
    }
    if refund.user_id != user_id {
        return Err(LedgerError::CrossUser(refund.id.into_inner()));
    }

    let pair = RefundPair::new(original.id, refund.id);
    if existing.contains(&pair) {
        return Err(LedgerError::AlreadyLinked(
            original.id.into_inner(),
            refund.id.into_inner(),
        ));
    }

    Ok(pair)
}
