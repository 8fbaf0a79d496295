//! Ledger source integration.
//!
//! This module provides the types and client used to pull blocks from a remote ledger API.
//! The sync engine only depends on the [`LedgerSource`] trait, so tests and alternative
//! backends can replace the HTTP client without touching the ingestion logic.

/// HTTP client for the blockchain.info JSON API
mod client;
/// Payload types and the source trait
mod types;

pub use client::{BlockchainInfoClient, DEFAULT_REQUEST_TIMEOUT};
pub use types::*;
