//! Ledger Synchronization Module
//!
//! This module provides the logic for ingesting a ledger into the property graph, one block at a
//! time, resuming wherever the previous run stopped. It is composed of several submodules:
//!
//! - `engine`: The main entry point. Derives the resume point, fetches blocks in sequence and wires together persistence, resolution, pacing and checkpoints.
//! - `persister`: Maps blocks, transactions and outputs to nodes and edges.
//! - `resolver`: Turns spend references into `received` edges between outputs and the transactions spending them.
//! - `pacing`: Request pacing and retry delays, behind an injectable `Pacer`.
//! - `events`: Event types and handler traits for observing a run.
//! - `progress_tracker`: Tracks persisted indices and counts, and produces the run statistics.
//!
//! A block is fully persisted and resolved before the next one is requested, which is what lets
//! the resolver assume every referenced output is already in the graph.

/// Main coordinator for the ingestion loop
pub mod engine;
/// Event system for observing sync runs
pub mod events;
/// Pacing and retry delays
pub mod pacing;
/// Ledger payload to graph mapping
pub mod persister;
/// Tracks synchronization progress and statistics
pub mod progress_tracker;
/// Spend reference resolution
pub mod resolver;
/// Engine states and errors
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use engine::{SyncEngine, latest_local_block_node};
pub use events::{EventDispatcher, LoggingEventHandler, SyncEvent, SyncEventHandler};
pub use pacing::{Pacer, SyncConfig, TokioPacer, WaitReason};
pub use progress_tracker::SyncStats;
pub use resolver::{LookupMode, ResolutionOutcome, SkipReason, UtxoResolver};
pub use types::{SyncError, SyncState};
