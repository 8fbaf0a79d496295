//! The resumable ingestion loop.
//!
//! A run derives its resume point from the graph itself, asks the ledger source for the chain
//! head, then fetches, persists and resolves one block at a time until the head is reached.
//! Blocks are requested strictly in sequence: a failed fetch is retried for the same index after
//! the retry policy's delay, never skipped.

use crate::graph::snapshot::{CheckpointConfig, SnapshotRepository};
use crate::graph::{
	Direction, GraphError, GraphStore, NodeHandle, Relationship, TraversalOrder, property_u64,
};
use crate::ledger::{Block, LedgerError, LedgerSource};
use crate::sync::events::{EventDispatcher, SyncEvent, SyncEventHandler};
use crate::sync::pacing::{Pacer, SyncConfig, WaitReason};
use crate::sync::persister::{self, BLOCK_INDEX};
use crate::sync::progress_tracker::{SyncProgressTracker, SyncStats};
use crate::sync::resolver::{LookupMode, UtxoResolver};
use crate::sync::types::{SyncError, SyncState};

use backoff::backoff::Backoff;
use tracing::{debug, error, info, warn};

/// Find the most recently persisted block.
///
/// Follows `succeeds` edges backwards from the anchor, depth first, and returns the first node
/// that nothing succeeds yet, together with its block index. A graph holding no blocks yields the
/// anchor itself and index 0.
pub fn latest_local_block_node<S: GraphStore>(store: &S) -> Result<(NodeHandle, u64), GraphError> {
	let anchor = store.anchor();

	for node in store.traverse(
		anchor,
		TraversalOrder::DepthFirst,
		Direction::Incoming,
		Some(Relationship::Succeeds),
	) {
		if !store.has_edge(node, Direction::Incoming, Some(Relationship::Succeeds)) {
			let index = property_u64(store.node(node)?, BLOCK_INDEX).unwrap_or(0);
			return Ok((node, index));
		}
	}

	// The traversal always yields the anchor, so this is only reached for a cyclic chain
	Err(GraphError::Corrupted(
		"no frontier block found, the succeeds chain is cyclic".to_string(),
	))
}

/// Position of the engine in the chain: the last persisted block node and its index.
#[derive(Debug, Clone, Copy)]
struct Cursor {
	node: NodeHandle,
	index: u64,
}

/// Snapshot repository plus the bookkeeping needed to checkpoint periodically.
struct Checkpoints<S: Send + Sync + 'static> {
	repository: Box<dyn SnapshotRepository<S>>,
	config: CheckpointConfig,
	last_height: Option<u64>,
}

/// Drives ingestion from the graph's resume point to the ledger's chain head.
///
/// The engine owns the graph store for the duration of a run. Use [`SyncEngine::store`] or
/// [`SyncEngine::into_store`] to inspect it afterwards.
pub struct SyncEngine<S, L, P>
where
	S: GraphStore + Sync + 'static,
{
	store: S,
	source: L,
	pacer: P,
	config: SyncConfig,
	retry_policy: Box<dyn Backoff + Send>,
	resolver: UtxoResolver,
	checkpoints: Option<Checkpoints<S>>,
	dispatcher: EventDispatcher,
	state: SyncState,
}

impl<S, L, P> SyncEngine<S, L, P>
where
	S: GraphStore + Sync + 'static,
	L: LedgerSource,
	P: Pacer,
{
	pub fn new(store: S, source: L, pacer: P, config: SyncConfig) -> Self {
		let retry_policy = config.retry_policy();
		Self {
			store,
			source,
			pacer,
			config,
			retry_policy,
			resolver: UtxoResolver::new(LookupMode::default()),
			checkpoints: None,
			dispatcher: EventDispatcher::new(),
			state: SyncState::Idle,
		}
	}

	/// Choose how spend references locate their source transaction.
	pub fn with_resolver_mode(mut self, mode: LookupMode) -> Self {
		self.resolver = UtxoResolver::new(mode);
		self
	}

	/// Replace the default constant-delay retry policy.
	pub fn with_retry_policy(mut self, policy: Box<dyn Backoff + Send>) -> Self {
		self.retry_policy = policy;
		self
	}

	/// Write graph snapshots to `repository` every `config.interval` blocks and at the end of
	/// each run.
	pub fn with_snapshots(
		mut self,
		repository: Box<dyn SnapshotRepository<S>>,
		config: CheckpointConfig,
	) -> Self {
		self.checkpoints = Some(Checkpoints {
			repository,
			config,
			last_height: None,
		});
		self
	}

	pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
		self.dispatcher.register_handler(handler);
	}

	pub fn state(&self) -> SyncState {
		self.state
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn into_store(self) -> S {
		self.store
	}

	/// Ingest every block between the graph's resume point and the current chain head.
	///
	/// Returns the run statistics once the head is reached. Fails fast with
	/// [`SyncError::SourceUnavailable`] if the head cannot be determined, in which case nothing
	/// is written. An interrupted wait stops the run with [`SyncError::Interrupted`], leaving the
	/// last fully persisted block as the resume point.
	pub async fn sync_to_latest(&mut self) -> Result<SyncStats, SyncError> {
		self.state = SyncState::Resuming;
		let mut cursor = match self.resume_point() {
			Ok(cursor) => cursor,
			Err(e) => return Err(self.stop(e).await),
		};

		self.state = SyncState::Polling;
		let head = match self.source.latest_height().await {
			Ok(head) => head,
			Err(e) => return Err(self.stop(SyncError::SourceUnavailable(e.to_string())).await),
		};

		if cursor.index >= head {
			info!("Graph is up to date at block {} (chain head {})", cursor.index, head);
		} else {
			info!(
				"Syncing blocks {} to {} ({} blocks)",
				cursor.index + 1,
				head,
				head - cursor.index
			);
		}

		let start_index = cursor.index;
		let mut tracker = SyncProgressTracker::new(start_index, self.config.progress_log_interval);
		let outcome = self.run(&mut cursor, head, &mut tracker).await;

		// Snapshots are only consistent when the run ended between two blocks
		let at_boundary = match &outcome {
			Ok(()) => true,
			Err(e) => e.at_block_boundary(),
		};
		let checkpoint = if at_boundary && cursor.index > start_index {
			self.checkpoint(cursor.index, true).await
		} else {
			Ok(())
		};
		if let (Err(_), Err(e)) = (&outcome, &checkpoint) {
			warn!("Failed to write final checkpoint at block {}: {}", cursor.index, e);
		}

		tracker.log_progress(true);
		tracker.validate_completion();

		match outcome.and(checkpoint) {
			Ok(()) => {
				let stats = tracker.get_stats();
				self.dispatcher
					.dispatch(&SyncEvent::SyncCompleted {
						final_index: cursor.index,
						blocks_persisted: stats.blocks_persisted,
					})
					.await;
				self.state = SyncState::Idle;
				info!("{}", stats.summary());
				Ok(stats)
			}
			Err(e) => Err(self.stop(e).await),
		}
	}

	fn resume_point(&mut self) -> Result<Cursor, SyncError> {
		let (node, index) = latest_local_block_node(&self.store)
			.map_err(|e| SyncError::ResumeError(e.to_string()))?;
		let indexed = self
			.resolver
			.rebuild_index(&self.store)
			.map_err(|e| SyncError::ResumeError(e.to_string()))?;

		debug!(
			"Resume point is {} at block {} ({} transactions indexed)",
			node, index, indexed
		);
		Ok(Cursor { node, index })
	}

	async fn run(
		&mut self,
		cursor: &mut Cursor,
		head: u64,
		tracker: &mut SyncProgressTracker,
	) -> Result<(), SyncError> {
		while cursor.index < head {
			let next = cursor.index + 1;
			self.state = SyncState::Fetching;

			match self.source.block(next).await {
				Ok(block) if block.block_index == next => {
					cursor.node = self.ingest_block(&block, cursor.node, tracker).await?;

					self.state = SyncState::Advancing;
					cursor.index = block.block_index;
					self.retry_policy.reset();
					tracker.log_progress(false);

					if let Err(e) = self.checkpoint(cursor.index, false).await {
						warn!("Failed to write checkpoint at block {}: {}", cursor.index, e);
					}
				}
				Ok(block) => {
					let error = LedgerError::FetchFailed {
						index: next,
						reason: format!("source returned block {} instead", block.block_index),
					};
					self.retry_after(next, error, tracker).await?;
				}
				Err(e) => self.retry_after(next, e, tracker).await?,
			}

			if cursor.index < head {
				self.state = SyncState::Polling;
				self.pacer
					.wait(self.config.pacing_interval, WaitReason::Pacing)
					.await?;
			}
		}

		Ok(())
	}

	/// Persist `block` after `previous` and resolve the spend references of its transactions.
	///
	/// Transactions are handled in block order, each one's outputs persisted before its inputs are
	/// resolved, so spends of earlier outputs in the same block are found.
	async fn ingest_block(
		&mut self,
		block: &Block,
		previous: NodeHandle,
		tracker: &mut SyncProgressTracker,
	) -> Result<NodeHandle, SyncError> {
		self.state = SyncState::Persisting;
		let block_node = persister::persist_block(&mut self.store, block, previous)?;

		let mut outputs = 0;
		for tx in &block.tx {
			self.state = SyncState::Persisting;
			let tx_node =
				persister::persist_transaction(&mut self.store, tx, block_node, &block.hash)?;
			outputs += persister::persist_outputs(&mut self.store, tx, tx_node)?;
			self.resolver.register_transaction(tx.tx_index, tx_node);

			self.state = SyncState::Resolving;
			for reference in tx.spend_references() {
				let outcome = self.resolver.resolve(&mut self.store, tx_node, reference)?;
				tracker.record_resolution(&outcome);
				self.dispatcher
					.dispatch(&SyncEvent::SpendResolved {
						spending_tx_index: tx.tx_index,
						reference_tx_index: reference.tx_index,
						n: reference.n,
						outcome,
					})
					.await;
			}
		}

		tracker.record_block(block.block_index, block.tx.len(), outputs);
		debug!(
			"Persisted block {} ({}) with {} transactions and {} outputs",
			block.block_index,
			block.hash,
			block.tx.len(),
			outputs
		);
		self.dispatcher
			.dispatch(&SyncEvent::BlockPersisted {
				index: block.block_index,
				hash: block.hash.clone(),
				time: block.time,
				transactions: block.tx.len(),
				outputs,
				value: block.output_value(),
			})
			.await;

		Ok(block_node)
	}

	async fn retry_after(
		&mut self,
		index: u64,
		error: LedgerError,
		tracker: &mut SyncProgressTracker,
	) -> Result<(), SyncError> {
		let Some(delay) = self.retry_policy.next_backoff() else {
			error!("Giving up on block {} after repeated failures: {}", index, error);
			return Err(SyncError::RetriesExhausted { index });
		};

		warn!(
			"Failed to fetch block {}: {}. Retrying in {:?}",
			index, error, delay
		);
		tracker.record_retry(index);
		self.dispatcher
			.dispatch(&SyncEvent::FetchRetry {
				index,
				error: error.to_string(),
				delay,
			})
			.await;

		self.state = SyncState::Backoff;
		self.pacer.wait(delay, WaitReason::Backoff).await
	}

	/// Write a snapshot at `height` if one is due.
	///
	/// Periodic checkpoints are due every `interval` blocks. A final checkpoint is always due
	/// unless the same height was already written.
	async fn checkpoint(&mut self, height: u64, final_checkpoint: bool) -> Result<(), SyncError> {
		let Some(checkpoints) = self.checkpoints.as_mut() else {
			return Ok(());
		};

		let interval = checkpoints.config.interval;
		let due = final_checkpoint || (interval > 0 && height % interval == 0);
		if !due || checkpoints.last_height == Some(height) {
			return Ok(());
		}

		checkpoints.repository.save(&self.store, height).await?;
		checkpoints.last_height = Some(height);
		if let Err(e) = checkpoints
			.repository
			.cleanup_old(checkpoints.config.keep_count)
			.await
		{
			warn!("Failed to clean up old snapshots: {}", e);
		}

		self.dispatcher
			.dispatch(&SyncEvent::CheckpointSaved { height })
			.await;
		Ok(())
	}

	async fn stop(&mut self, error: SyncError) -> SyncError {
		error!("Sync stopped: {}", error);
		self.state = SyncState::Stopped;
		self.dispatcher
			.dispatch(&SyncEvent::SyncError {
				error: error.to_string(),
				recoverable: error.at_block_boundary(),
			})
			.await;
		error
	}
}
