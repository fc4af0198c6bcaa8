//! Database enum mappings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction kind as stored in Postgres.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_kind")]
pub enum TransactionKind {
    /// Money coming into an account.
    #[sea_orm(string_value = "income")]
    Income,
    /// Money leaving an account.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// One leg of a two-leg transfer.
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

impl From<tally_core::ledger::TransactionKind> for TransactionKind {
    fn from(kind: tally_core::ledger::TransactionKind) -> Self {
        match kind {
            tally_core::ledger::TransactionKind::Income => Self::Income,
            tally_core::ledger::TransactionKind::Expense => Self::Expense,
            tally_core::ledger::TransactionKind::Transfer => Self::Transfer,
        }
    }
}

impl From<TransactionKind> for tally_core::ledger::TransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => Self::Income,
            TransactionKind::Expense => Self::Expense,
            TransactionKind::Transfer => Self::Transfer,
        }
    }
}
