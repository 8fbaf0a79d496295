//! Resumable ingestion of a public ledger into a property graph.
//!
//! Blocks are fetched in sequence from a [`ledger::LedgerSource`], persisted as nodes and edges in
//! a [`graph::GraphStore`], and every spend reference is resolved into a `received` edge between
//! the output it consumes and the spending transaction. The [`sync::SyncEngine`] resumes from the
//! last persisted block on every run.

pub mod config;
pub mod graph;
pub mod ledger;
pub mod sync;
pub mod utils;
