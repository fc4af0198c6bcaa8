//! `SeaORM` entity definitions for the ledger schema.

pub mod accounts;
pub mod balance_entries;
pub mod exchange_rates;
pub mod refund_links;
pub mod sea_orm_active_enums;
pub mod sessions;
pub mod transactions;
pub mod users;
