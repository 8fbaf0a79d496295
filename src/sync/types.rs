use crate::graph::GraphError;
use crate::sync::pacing::WaitReason;

use std::fmt;

/// Phases of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
	/// Not running. Initial state and the state after a completed run.
	Idle,
	/// Deriving the resume point from the graph.
	Resuming,
	/// Asking the ledger source for the chain head, or about to fetch the next block.
	Polling,
	Fetching,
	Persisting,
	Resolving,
	Advancing,
	/// Waiting before retrying a failed fetch.
	Backoff,
	/// Terminated by an unrecoverable error or shutdown.
	Stopped,
}

impl fmt::Display for SyncState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// Error types for ledger synchronization
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Graph error: {0}")]
	GraphError(#[from] GraphError),

	#[error("Ledger source unavailable: {0}")]
	SourceUnavailable(String),

	#[error("Resume state error: {0}")]
	ResumeError(String),

	#[error("Wait interrupted during {0}")]
	Interrupted(WaitReason),

	#[error("Retry policy exhausted while fetching block {index}")]
	RetriesExhausted { index: u64 },
}

impl SyncError {
	/// Whether the graph is known to end at a block boundary after this error.
	///
	/// Waits and retry decisions only happen between blocks; store errors can strike mid-block.
	pub fn at_block_boundary(&self) -> bool {
		matches!(
			self,
			SyncError::Interrupted(_) | SyncError::RetriesExhausted { .. }
		)
	}
}
