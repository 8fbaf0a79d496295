//! Spend reference resolution.
//!
//! Every input of a persisted transaction that carries a spend reference points at an output
//! created by an earlier transaction. The [`UtxoResolver`] finds the money node for that output
//! and records the spend as a `received` edge from the output to the spending transaction.
//!
//! Transactions are located by their ledger-wide `tx_index`. The resolver keeps a
//! `tx_index -> node` index that the engine feeds as it persists transactions and rebuilds from
//! the graph on resume, so a missing entry means the transaction was never persisted. A
//! breadth-first walk of the graph from the spending transaction is only used to recover from a
//! stale entry, and is the only strategy in [`LookupMode::Traversal`].

use crate::graph::{
	Direction, EdgeHandle, GraphError, GraphStore, NodeHandle, Properties, Relationship,
	TraversalOrder, property_str, property_u64,
};
use crate::ledger::PrevOut;
use crate::sync::persister::{ADDR, N, TX_INDEX};

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Why a spend reference produced no settlement edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
	/// The reference carries no address to match against.
	MissingAddress,
	/// No persisted transaction has the referenced `tx_index`.
	TransactionNotFound,
	/// The referenced transaction has no output with a matching position and address.
	OutputNotFound,
	/// The matching output is already spent by another transaction.
	AlreadySettled,
}

impl fmt::Display for SkipReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let reason = match self {
			SkipReason::MissingAddress => "reference has no address",
			SkipReason::TransactionNotFound => "transaction not found",
			SkipReason::OutputNotFound => "output not found",
			SkipReason::AlreadySettled => "output already settled",
		};
		f.write_str(reason)
	}
}

/// Result of resolving one spend reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
	/// A `received` edge was created from `output` to the spending transaction.
	Matched { output: NodeHandle, edge: EdgeHandle },
	/// No edge was created.
	Skipped(SkipReason),
}

impl ResolutionOutcome {
	pub fn is_matched(&self) -> bool {
		matches!(self, ResolutionOutcome::Matched { .. })
	}
}

/// How the resolver locates the transaction that created a referenced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupMode {
	/// `tx_index` index lookup; a miss skips the reference without walking the graph.
	#[default]
	Indexed,
	/// Breadth-first traversal from the spending transaction for every reference.
	Traversal,
}

/// Address matching rule between a stored output and a spend reference.
///
/// Script encodings with several addresses are stored as one address string, so containment is
/// accepted in either direction: a reference to `1A2b3c` settles a stored `1A2b` output, and a
/// reference to `1A2b` settles a stored `1A2b3c`. Empty addresses never match.
pub fn address_matches(output_addr: &str, reference_addr: &str) -> bool {
	!output_addr.is_empty()
		&& !reference_addr.is_empty()
		&& (output_addr.contains(reference_addr) || reference_addr.contains(output_addr))
}

/// Resolves spend references to the money nodes they consume.
#[derive(Debug, Default)]
pub struct UtxoResolver {
	mode: LookupMode,
	tx_nodes: HashMap<u64, NodeHandle>,
}

impl UtxoResolver {
	pub fn new(mode: LookupMode) -> Self {
		Self {
			mode,
			tx_nodes: HashMap::new(),
		}
	}

	/// Number of transactions currently held in the `tx_index` index.
	pub fn indexed_transactions(&self) -> usize {
		self.tx_nodes.len()
	}

	/// Record a freshly persisted transaction node.
	pub fn register_transaction(&mut self, tx_index: u64, node: NodeHandle) {
		if self.mode == LookupMode::Indexed {
			self.tx_nodes.insert(tx_index, node);
		}
	}

	/// Rebuild the `tx_index` index from every transaction reachable from the anchor.
	///
	/// Used after resuming from a previously persisted graph.
	pub fn rebuild_index<S: GraphStore>(&mut self, store: &S) -> Result<usize, GraphError> {
		if self.mode != LookupMode::Indexed {
			return Ok(0);
		}

		self.tx_nodes.clear();
		for node in store.traverse(
			store.anchor(),
			TraversalOrder::BreadthFirst,
			Direction::Both,
			None,
		) {
			if let Some(tx_index) = property_u64(store.node(node)?, TX_INDEX) {
				self.tx_nodes.insert(tx_index, node);
			}
		}

		debug!("Rebuilt transaction index with {} entries", self.tx_nodes.len());
		Ok(self.tx_nodes.len())
	}

	/// Resolve `reference`, spent by the transaction persisted as `spending`.
	///
	/// # Preconditions
	/// Every block preceding the one containing `spending` is fully persisted in `store`, and so
	/// is every earlier transaction of the same block. Under that ordering a miss means the
	/// reference is invalid or points outside the ingested chain, never that the output is
	/// still in flight.
	///
	/// Misses are reported as [`ResolutionOutcome::Skipped`], never as errors; only store failures
	/// are returned as `Err`.
	pub fn resolve<S: GraphStore>(
		&mut self,
		store: &mut S,
		spending: NodeHandle,
		reference: &PrevOut,
	) -> Result<ResolutionOutcome, GraphError> {
		let Some(addr) = reference.addr.as_deref().filter(|a| !a.is_empty()) else {
			return Ok(ResolutionOutcome::Skipped(SkipReason::MissingAddress));
		};

		let Some(tx_node) = self.find_transaction(store, spending, reference.tx_index)? else {
			debug!(
				"No transaction with tx_index {} for reference {}:{}",
				reference.tx_index, reference.tx_index, reference.n
			);
			return Ok(ResolutionOutcome::Skipped(SkipReason::TransactionNotFound));
		};

		let Some(output) = find_output(store, tx_node, reference.n, addr)? else {
			debug!(
				"Transaction {} has no output {} for address {}",
				reference.tx_index, reference.n, addr
			);
			return Ok(ResolutionOutcome::Skipped(SkipReason::OutputNotFound));
		};

		// An output settles at most once
		if store.has_edge(output, Direction::Outgoing, Some(Relationship::Received)) {
			return Ok(ResolutionOutcome::Skipped(SkipReason::AlreadySettled));
		}

		let properties = Properties::from([(TX_INDEX.to_string(), reference.tx_index.into())]);
		let edge = store.create_edge(output, spending, Relationship::Received, properties)?;

		Ok(ResolutionOutcome::Matched { output, edge })
	}

	fn find_transaction<S: GraphStore>(
		&mut self,
		store: &S,
		spending: NodeHandle,
		tx_index: u64,
	) -> Result<Option<NodeHandle>, GraphError> {
		if self.mode == LookupMode::Indexed {
			// The index holds every persisted transaction, so a miss is final
			let Some(&node) = self.tx_nodes.get(&tx_index) else {
				return Ok(None);
			};
			if property_u64(store.node(node)?, TX_INDEX) == Some(tx_index) {
				return Ok(Some(node));
			}
			warn!("Stale index entry for tx_index {}, falling back to traversal", tx_index);
			self.tx_nodes.remove(&tx_index);
		}

		let mut found = None;
		for node in store.traverse(spending, TraversalOrder::BreadthFirst, Direction::Both, None) {
			if property_u64(store.node(node)?, TX_INDEX) == Some(tx_index) {
				found = Some(node);
				break;
			}
		}

		if let Some(node) = found {
			self.register_transaction(tx_index, node);
		}
		Ok(found)
	}
}

fn find_output<S: GraphStore>(
	store: &S,
	tx_node: NodeHandle,
	n: u64,
	addr: &str,
) -> Result<Option<NodeHandle>, GraphError> {
	for edge in store.edges(tx_node, Direction::Outgoing, Some(Relationship::Sent)) {
		let properties = store.node(edge.to)?;
		let position_matches = property_u64(properties, N) == Some(n);
		let address_match =
			property_str(properties, ADDR).is_some_and(|stored| address_matches(stored, addr));

		if position_matches && address_match {
			return Ok(Some(edge.to));
		}
	}

	Ok(None)
}
