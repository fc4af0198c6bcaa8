//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and balance calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Transaction ledger and balance timeline
//! - `currency` - Reference-currency normalization and exchange rates
//! - `transfer` - Two-leg transfer pairing
//! - `refund` - Refund link validation

pub mod currency;
pub mod ledger;
pub mod refund;
pub mod transfer;
