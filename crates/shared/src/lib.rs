//! Shared types and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Currency code type with ISO 4217 validation
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
