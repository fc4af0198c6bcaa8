//! Transfer engine: paired two-leg moves between a user's accounts.

pub mod pairing;

pub use pairing::{lock_order, plan_transfer, TransferInput, TransferPlan};
