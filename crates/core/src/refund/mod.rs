//! Refund links: informational associations between transactions.

pub mod link;

pub use link::{validate_link, RefundPair};
