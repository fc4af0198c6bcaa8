//! Transaction ledger domain: validation, resolution, and balance timelines.

pub mod balance;
pub mod error;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;

pub use balance::BalanceTimeline;
pub use error::LedgerError;
pub use service::{BalanceDelta, LedgerService, UpdateEffect};
pub use types::{
    AccountSnapshot, BalancePoint, CreateTransactionInput, ResolvedTransaction,
    TransactionChanges, TransactionKind, TransactionRecord,
};
