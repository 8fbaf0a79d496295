//! Mapping from ledger payloads to graph nodes and edges.
//!
//! Every persisted entity gets its own node. Property names follow the ledger API field names so
//! the graph can be queried with the same vocabulary as the source.

use crate::graph::{GraphError, GraphStore, NodeHandle, Properties, PropertyValue, Relationship};
use crate::ledger::{Block, Output, Transaction};

pub const BLOCK_INDEX: &str = "block_index";
pub const TX_INDEX: &str = "tx_index";
pub const ADDR: &str = "addr";
pub const N: &str = "n";

fn insert(properties: &mut Properties, key: &str, value: impl Into<PropertyValue>) {
	properties.insert(key.to_string(), value.into());
}

fn insert_opt(properties: &mut Properties, key: &str, value: Option<impl Into<PropertyValue>>) {
	if let Some(value) = value {
		insert(properties, key, value);
	}
}

pub fn block_properties(block: &Block) -> Properties {
	let mut props = Properties::new();
	insert(&mut props, "hash", block.hash.as_str());
	insert(&mut props, "ver", block.ver);
	insert(&mut props, "prev_block", block.prev_block.as_str());
	insert(&mut props, "mrkl_root", block.mrkl_root.as_str());
	insert(&mut props, "time", block.time);
	insert(&mut props, "bits", block.bits);
	insert(&mut props, "nonce", block.nonce);
	insert(&mut props, "n_tx", block.n_tx);
	insert(&mut props, "size", block.size);
	insert(&mut props, BLOCK_INDEX, block.block_index);
	insert(&mut props, "main_chain", block.main_chain);
	insert(&mut props, "height", block.height);
	insert_opt(&mut props, "received_time", block.received_time);
	insert_opt(&mut props, "relayed_by", block.relayed_by.as_deref());
	props
}

pub fn transaction_properties(tx: &Transaction) -> Properties {
	let mut props = Properties::new();
	insert(&mut props, "hash", tx.hash.as_str());
	insert(&mut props, "ver", tx.ver);
	insert(&mut props, "vin_sz", tx.vin_sz);
	insert(&mut props, "vout_sz", tx.vout_sz);
	insert(&mut props, "size", tx.size);
	insert_opt(&mut props, "relayed_by", tx.relayed_by.as_deref());
	insert(&mut props, TX_INDEX, tx.tx_index);
	props
}

/// Properties of the money node for the output at position `n`.
pub fn output_properties(output: &Output, n: u64) -> Properties {
	let mut props = Properties::new();
	insert(&mut props, "type", output.script_type);
	insert_opt(&mut props, ADDR, output.addr.as_deref());
	insert(&mut props, "value", output.value);
	insert(&mut props, N, n);
	props
}

/// Persist a block node and link it to its predecessor with a `succeeds` edge.
pub fn persist_block<S: GraphStore>(
	store: &mut S,
	block: &Block,
	previous: NodeHandle,
) -> Result<NodeHandle, GraphError> {
	let node = store.create_node(block_properties(block))?;
	store.create_edge(node, previous, Relationship::Succeeds, Properties::new())?;
	Ok(node)
}

/// Persist a transaction node with its `from` edge to the owning block.
pub fn persist_transaction<S: GraphStore>(
	store: &mut S,
	tx: &Transaction,
	block_node: NodeHandle,
	block_hash: &str,
) -> Result<NodeHandle, GraphError> {
	let node = store.create_node(transaction_properties(tx))?;

	let mut from = Properties::new();
	insert(&mut from, "block_hash", block_hash);
	store.create_edge(node, block_node, Relationship::From, from)?;

	Ok(node)
}

/// Persist one money node per output, numbered from 0, each with a `sent` edge from `tx_node`.
///
/// Returns the number of outputs persisted.
pub fn persist_outputs<S: GraphStore>(
	store: &mut S,
	tx: &Transaction,
	tx_node: NodeHandle,
) -> Result<usize, GraphError> {
	for (n, output) in (0u64..).zip(&tx.out) {
		let node = store.create_node(output_properties(output, n))?;

		let mut sent = Properties::new();
		insert_opt(&mut sent, "to_addr", output.addr.as_deref());
		insert(&mut sent, N, n);
		store.create_edge(tx_node, node, Relationship::Sent, sent)?;
	}

	Ok(tx.out.len())
}
