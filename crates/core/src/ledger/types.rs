//! Ledger domain types for transaction creation and mutation.
//!
//! Amounts come in two shapes: inputs carry a positive magnitude in the
//! account's native minor units with a kind that determines the sign;
//! stored records carry the signed native amount plus the signed
//! reference-currency amount (`ref_amount`). The sign of `ref_amount`
//! always matches the sign of `amount`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, CurrencyCode, TransactionId, TransferId, UserId};

/// Transaction kind classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming into an account.
    Income,
    /// Money leaving an account.
    Expense,
    /// One leg of a two-leg transfer; only the transfer engine creates these.
    Transfer,
}

impl TransactionKind {
    /// Applies the sign this kind implies to a positive magnitude.
    ///
    /// Transfer legs carry their sign explicitly (negative source leg,
    /// positive destination leg), so this is only meaningful for plain kinds.
    #[must_use]
    pub const fn signed(self, magnitude: i64) -> i64 {
        match self {
            Self::Income => magnitude,
            Self::Expense | Self::Transfer => -magnitude,
        }
    }

    /// Returns true for the transfer kind.
    #[must_use]
    pub const fn is_transfer(self) -> bool {
        matches!(self, Self::Transfer)
    }
}

/// A persisted ledger transaction as a plain data record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The transaction ID.
    pub id: TransactionId,
    /// The owning user.
    pub user_id: UserId,
    /// The account the transaction posts to.
    pub account_id: AccountId,
    /// Signed amount in the account's native minor units.
    pub amount: i64,
    /// Signed amount in the user's reference-currency minor units.
    pub ref_amount: i64,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Ledger date used for balance ordering.
    pub occurred_on: NaiveDate,
    /// Set when this transaction is one leg of a transfer.
    pub transfer_id: Option<TransferId>,
    /// Optional link to an external-source record.
    pub external_ref: Option<String>,
    /// Optional free-form note.
    pub note: Option<String>,
}

/// The account fields the ledger needs for validation and normalization.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    /// The account ID.
    pub id: AccountId,
    /// The owning user.
    pub user_id: UserId,
    /// The account's native currency.
    pub currency: CurrencyCode,
    /// Whether the account accepts new transactions.
    pub is_enabled: bool,
    /// Opening balance in reference-currency minor units.
    pub ref_initial_balance: i64,
}

/// Input for creating a plain (non-transfer) transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// The acting user.
    pub user_id: UserId,
    /// The account to post to.
    pub account_id: AccountId,
    /// Income or expense; the transfer kind is rejected on this path.
    pub kind: TransactionKind,
    /// Positive magnitude in the account's native minor units.
    pub amount: i64,
    /// Ledger date.
    pub occurred_on: NaiveDate,
    /// Optional note.
    pub note: Option<String>,
    /// Optional link to an external-source record.
    pub external_ref: Option<String>,
}

/// Changes to apply to an existing plain transaction.
///
/// `None` fields are left untouched. Changing `amount`, `kind`,
/// `account_id`, or `occurred_on` re-derives the balance effect
/// (reverse old, apply new).
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    /// New positive magnitude.
    pub amount: Option<i64>,
    /// New kind (income or expense).
    pub kind: Option<TransactionKind>,
    /// Move to a different account.
    pub account_id: Option<AccountId>,
    /// New ledger date.
    pub occurred_on: Option<NaiveDate>,
    /// Replace the note.
    pub note: Option<String>,
}

impl TransactionChanges {
    /// Returns true if any change affects the balance effect.
    #[must_use]
    pub const fn affects_balance(&self) -> bool {
        self.amount.is_some()
            || self.kind.is_some()
            || self.account_id.is_some()
            || self.occurred_on.is_some()
    }
}

/// A transaction resolved against the currency normalizer, ready to persist.
#[derive(Debug, Clone)]
pub struct ResolvedTransaction {
    /// The owning user.
    pub user_id: UserId,
    /// The account to post to.
    pub account_id: AccountId,
    /// Signed native-currency amount.
    pub amount: i64,
    /// Signed reference-currency amount.
    pub ref_amount: i64,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Ledger date.
    pub occurred_on: NaiveDate,
    /// Transfer grouping, if any.
    pub transfer_id: Option<TransferId>,
    /// External-source link, if any.
    pub external_ref: Option<String>,
    /// Note, if any.
    pub note: Option<String>,
}

/// A dated cumulative balance point in reference-currency minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePoint {
    /// End-of-day date.
    pub date: NaiveDate,
    /// Cumulative balance at end of that date.
    pub cumulative: i64,
}
