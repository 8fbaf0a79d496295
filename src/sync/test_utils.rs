//! Mock ledger source, recording pacer and payload builders for sync tests.

use crate::ledger::{Block, Input, LedgerError, LedgerSource, Output, PrevOut, Transaction};
use crate::sync::SyncError;
use crate::sync::events::{SyncEvent, SyncEventHandler};
use crate::sync::pacing::{Pacer, WaitReason};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 64-character hex string derived from `seed`, usable as a block or transaction hash.
pub fn hash(seed: u64) -> String {
	format!("{:064x}", seed)
}

/// Block at `index` whose predecessor is `index - 1`.
pub fn block(index: u64, tx: Vec<Transaction>) -> Block {
	Block {
		hash: hash(0xb10c_0000 + index),
		ver: 1,
		prev_block: hash(0xb10c_0000 + index.saturating_sub(1)),
		mrkl_root: hash(0x3e_0000 + index),
		time: 1_231_006_505 + index * 600,
		bits: 486_604_799,
		nonce: index * 7,
		n_tx: tx.len() as u64,
		size: 285,
		block_index: index,
		main_chain: true,
		height: index,
		received_time: Some(1_231_006_505 + index * 600),
		relayed_by: Some("0.0.0.0".to_string()),
		tx,
	}
}

pub fn transaction(tx_index: u64, out: Vec<Output>, inputs: Vec<Input>) -> Transaction {
	Transaction {
		hash: hash(0x7a_0000 + tx_index),
		ver: 1,
		vin_sz: inputs.len() as u64,
		vout_sz: out.len() as u64,
		size: 134,
		relayed_by: None,
		tx_index,
		inputs,
		out,
	}
}

pub fn output(addr: &str, value: u64) -> Output {
	Output {
		script_type: 0,
		addr: Some(addr.to_string()),
		value,
	}
}

pub fn prev_out(tx_index: u64, n: u64, addr: &str) -> PrevOut {
	PrevOut {
		script_type: 0,
		addr: Some(addr.to_string()),
		value: 0,
		n,
		tx_index,
	}
}

/// Input spending output `n` of transaction `tx_index`.
pub fn spend(tx_index: u64, n: u64, addr: &str) -> Input {
	Input {
		prev_out: Some(prev_out(tx_index, n, addr)),
	}
}

/// Input without a spend reference.
pub fn coinbase() -> Input {
	Input::default()
}

/// Scripted responses and request log shared between a [`MockLedgerSource`] and the test.
#[derive(Debug, Default)]
pub struct MockLedgerStorage {
	/// Value returned by `latest_height`, `None` to simulate an unreachable source.
	pub head: Option<u64>,
	/// Blocks by index.
	pub blocks: HashMap<u64, Block>,
	/// Remaining scripted failures per index.
	pub failures: HashMap<u64, usize>,
	/// Every index passed to `block`, in call order.
	pub requested: Vec<u64>,
	/// Number of `latest_height` calls.
	pub head_queries: usize,
}

/// Ledger source serving scripted blocks from memory.
#[derive(Debug, Clone, Default)]
pub struct MockLedgerSource {
	storage: Arc<Mutex<MockLedgerStorage>>,
}

impl MockLedgerSource {
	/// Source serving `blocks`, with the head at the highest block index.
	pub fn with_blocks(blocks: Vec<Block>) -> Self {
		let head = blocks.iter().map(|b| b.block_index).max().unwrap_or(0);
		let source = Self::default();
		{
			let mut storage = source.storage.lock().unwrap();
			storage.head = Some(head);
			storage.blocks = blocks.into_iter().map(|b| (b.block_index, b)).collect();
		}
		source
	}

	/// Source whose head cannot be queried.
	pub fn unreachable() -> Self {
		Self::default()
	}

	/// Answer requests for `index` with `block`, whatever its own index.
	pub fn serve(&self, index: u64, block: Block) {
		self.storage.lock().unwrap().blocks.insert(index, block);
	}

	/// Fail the next `times` fetches of `index`.
	pub fn fail_block(&self, index: u64, times: usize) {
		self.storage.lock().unwrap().failures.insert(index, times);
	}

	pub fn requested(&self) -> Vec<u64> {
		self.storage.lock().unwrap().requested.clone()
	}

	pub fn head_queries(&self) -> usize {
		self.storage.lock().unwrap().head_queries
	}
}

#[async_trait::async_trait]
impl LedgerSource for MockLedgerSource {
	async fn latest_height(&self) -> Result<u64, LedgerError> {
		let mut storage = self.storage.lock().unwrap();
		storage.head_queries += 1;
		storage
			.head
			.ok_or_else(|| LedgerError::SourceUnavailable("connection refused".to_string()))
	}

	async fn block(&self, index: u64) -> Result<Block, LedgerError> {
		let mut storage = self.storage.lock().unwrap();
		storage.requested.push(index);

		if let Some(remaining) = storage.failures.get_mut(&index) {
			if *remaining > 0 {
				*remaining -= 1;
				return Err(LedgerError::FetchFailed {
					index,
					reason: "HTTP error: 503 Service Unavailable".to_string(),
				});
			}
		}

		storage
			.blocks
			.get(&index)
			.cloned()
			.ok_or_else(|| LedgerError::FetchFailed {
				index,
				reason: "HTTP error: 404 Not Found".to_string(),
			})
	}
}

/// Pacer that records every wait and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
	waits: Arc<Mutex<Vec<(Duration, WaitReason)>>>,
	/// Interrupt the wait with this zero-based position.
	interrupt_at: Option<usize>,
}

impl RecordingPacer {
	/// Pacer that interrupts its `position`-th wait, counting from zero.
	pub fn interrupting_at(position: usize) -> Self {
		Self {
			interrupt_at: Some(position),
			..Self::default()
		}
	}

	pub fn waits(&self) -> Vec<(Duration, WaitReason)> {
		self.waits.lock().unwrap().clone()
	}

	pub fn waits_for(&self, reason: WaitReason) -> Vec<Duration> {
		self.waits()
			.into_iter()
			.filter(|(_, r)| *r == reason)
			.map(|(delay, _)| delay)
			.collect()
	}
}

#[async_trait::async_trait]
impl Pacer for RecordingPacer {
	async fn wait(&mut self, delay: Duration, reason: WaitReason) -> Result<(), SyncError> {
		let mut waits = self.waits.lock().unwrap();
		let position = waits.len();
		waits.push((delay, reason));

		if self.interrupt_at == Some(position) {
			return Err(SyncError::Interrupted(reason));
		}
		Ok(())
	}
}

/// Event handler that keeps every event it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
	events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl RecordingHandler {
	pub fn events(&self) -> Arc<Mutex<Vec<SyncEvent>>> {
		Arc::clone(&self.events)
	}
}

#[async_trait::async_trait]
impl SyncEventHandler for RecordingHandler {
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError> {
		self.events.lock().unwrap().push(event.clone());
		Ok(())
	}

	fn name(&self) -> &'static str {
		"RecordingHandler"
	}
}
