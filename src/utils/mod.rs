//!
//! Utility module for the ledger graph sync.
//!
//! Re-exports formatting helpers used in log output throughout the codebase.
/// Utility functions for formatting and display
pub mod format;

pub use format::{SATOSHI_DECIMALS, format_amount};
