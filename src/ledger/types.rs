//! Types for the ledger source payloads and error handling

use serde::{Deserialize, Serialize};

/// Length in bytes of a block or transaction content hash.
const HASH_LEN: usize = 32;

/// Summary of the current chain head as reported by the ledger API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestBlock {
	/// Hash of the head block.
	pub hash: String,
	/// Block timestamp (unix seconds).
	#[serde(default)]
	pub time: u64,
	/// Sequential index of the head block. This is what the sync loop counts towards.
	pub block_index: u64,
	/// Height of the head block.
	#[serde(default)]
	pub height: u64,
}

/// A block as returned by the ledger API, including its transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
	/// The block content hash.
	pub hash: String,
	/// Block version.
	pub ver: u32,
	/// Hash of the predecessor block.
	pub prev_block: String,
	/// Merkle root of the block's transactions.
	pub mrkl_root: String,
	/// Block timestamp (unix seconds).
	pub time: u64,
	/// Compact difficulty target.
	pub bits: u64,
	/// Proof-of-work nonce.
	pub nonce: u64,
	/// Number of transactions in the block.
	pub n_tx: u64,
	/// Serialized size in bytes.
	pub size: u64,
	/// Sequential index assigned by the ledger API.
	pub block_index: u64,
	/// Whether the block is part of the main chain.
	#[serde(default)]
	pub main_chain: bool,
	/// Block height.
	pub height: u64,
	/// Time the relaying node first saw the block.
	#[serde(default)]
	pub received_time: Option<u64>,
	/// Address of the relaying node.
	#[serde(default)]
	pub relayed_by: Option<String>,
	/// Transactions contained in the block, in block order.
	#[serde(default)]
	pub tx: Vec<Transaction>,
}

impl Block {
	/// Check the block and its transactions for malformed content hashes.
	pub fn validate(&self) -> Result<(), LedgerError> {
		validate_hash("block", &self.hash)?;
		for tx in &self.tx {
			validate_hash("transaction", &tx.hash)?;
		}
		Ok(())
	}

	/// Total value of all outputs created in this block, in satoshis.
	pub fn output_value(&self) -> u64 {
		self.tx
			.iter()
			.flat_map(|tx| tx.out.iter())
			.fold(0u64, |acc, out| acc.saturating_add(out.value))
	}
}

/// A transaction inside a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
	/// The transaction content hash.
	pub hash: String,
	/// Transaction version.
	pub ver: u32,
	/// Number of inputs.
	pub vin_sz: u64,
	/// Number of outputs.
	pub vout_sz: u64,
	/// Serialized size in bytes.
	pub size: u64,
	/// Address of the relaying node.
	#[serde(default)]
	pub relayed_by: Option<String>,
	/// Ledger-wide sequence index, used as the join key for spend references.
	pub tx_index: u64,
	/// Transaction inputs.
	#[serde(default)]
	pub inputs: Vec<Input>,
	/// Transaction outputs, in positional order.
	#[serde(default)]
	pub out: Vec<Output>,
}

impl Transaction {
	/// Iterate over the spend references carried by this transaction's inputs.
	///
	/// Inputs without a reference (coinbase) are skipped.
	pub fn spend_references(&self) -> impl Iterator<Item = &PrevOut> {
		self.inputs.iter().filter_map(|input| input.prev_out.as_ref())
	}
}

/// A transaction input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Input {
	/// The output this input spends. `None` for coinbase inputs.
	#[serde(default)]
	pub prev_out: Option<PrevOut>,
}

/// A transaction output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
	/// Script type.
	#[serde(rename = "type", default)]
	pub script_type: u32,
	/// Destination address. Absent for non-standard scripts.
	#[serde(default)]
	pub addr: Option<String>,
	/// Value in satoshis.
	pub value: u64,
}

/// Reference to a previously created output, embedded in a spending input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrevOut {
	/// Script type of the referenced output.
	#[serde(rename = "type", default)]
	pub script_type: u32,
	/// Address of the referenced output.
	#[serde(default)]
	pub addr: Option<String>,
	/// Value of the referenced output in satoshis.
	pub value: u64,
	/// Position of the referenced output in its transaction's output list.
	pub n: u64,
	/// Sequence index of the transaction that created the referenced output.
	pub tx_index: u64,
}

/// Remote source of ledger blocks.
///
/// Implementations perform no retries of their own; the sync engine owns all resilience.
#[async_trait::async_trait]
pub trait LedgerSource: Send + Sync {
	/// Sequential index of the current chain head.
	///
	/// Fails with [`LedgerError::SourceUnavailable`] when the source cannot be reached.
	async fn latest_height(&self) -> Result<u64, LedgerError>;

	/// Fetch the block with the given sequential index.
	///
	/// Fails with [`LedgerError::FetchFailed`] for the requested index.
	async fn block(&self, index: u64) -> Result<Block, LedgerError>;
}

/// Error types for ledger source operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
	#[error("Ledger source unavailable: {0}")]
	SourceUnavailable(String),

	#[error("Failed to fetch block {index}: {reason}")]
	FetchFailed { index: u64, reason: String },

	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("HTTP status: {0}")]
	HttpStatus(reqwest::StatusCode),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Malformed payload: {0}")]
	MalformedPayload(String),
}

fn validate_hash(kind: &str, hash: &str) -> Result<(), LedgerError> {
	let bytes = hex::decode(hash).map_err(|e| {
		LedgerError::MalformedPayload(format!("Invalid {} hash {:?}: {}", kind, hash, e))
	})?;

	if bytes.len() != HASH_LEN {
		return Err(LedgerError::MalformedPayload(format!(
			"Invalid {} hash length {} for {:?}",
			kind,
			bytes.len(),
			hash
		)));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	const BLOCK_JSON: &str = r#"{
		"hash": "00000000839a8e6886ab5951d76f411475428afc90947ee320161bbf18eb6048",
		"ver": 1,
		"prev_block": "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
		"mrkl_root": "0e3e2357e806b6cdb1f70b54c3a3a17b6714ee1f0e68bebb44a74b1efd512098",
		"time": 1231469665,
		"bits": 486604799,
		"nonce": 2573394689,
		"n_tx": 2,
		"size": 215,
		"block_index": 1,
		"main_chain": true,
		"height": 1,
		"received_time": 1231469665,
		"relayed_by": "0.0.0.0",
		"tx": [
			{
				"hash": "0e3e2357e806b6cdb1f70b54c3a3a17b6714ee1f0e68bebb44a74b1efd512098",
				"ver": 1,
				"vin_sz": 1,
				"vout_sz": 2,
				"size": 134,
				"relayed_by": "0.0.0.0",
				"tx_index": 14849,
				"inputs": [{}],
				"out": [
					{ "type": 0, "addr": "12c6DSiU4Rq3P4ZxziKxzrGDGjYb4Z8DNf", "value": 5000000000, "n": 0, "tx_index": 14849 },
					{ "type": 0, "value": 10, "n": 1, "tx_index": 14849 }
				]
			},
			{
				"hash": "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
				"ver": 1,
				"vin_sz": 1,
				"vout_sz": 1,
				"size": 275,
				"tx_index": 14850,
				"inputs": [
					{ "prev_out": { "type": 0, "addr": "12c6DSiU4Rq3P4ZxziKxzrGDGjYb4Z8DNf", "value": 5000000000, "n": 0, "tx_index": 14849 } }
				],
				"out": [
					{ "type": 0, "addr": "1Q2TWHE3GMdB6BZKafqwxXtWAWgFt5Jvm3", "value": 1000000000 }
				]
			}
		]
	}"#;

	#[test]
	fn test_parse_block_payload() {
		let block: Block = serde_json::from_str(BLOCK_JSON).expect("block payload should parse");
		assert_eq!(block.block_index, 1);
		assert_eq!(block.tx.len(), 2);
		assert!(block.main_chain);
		assert_eq!(block.relayed_by.as_deref(), Some("0.0.0.0"));

		let coinbase = &block.tx[0];
		assert_eq!(coinbase.spend_references().count(), 0);
		assert_eq!(coinbase.out[1].addr, None);

		let spend = &block.tx[1];
		let reference = spend.spend_references().next().expect("spend reference");
		assert_eq!(reference.tx_index, 14849);
		assert_eq!(reference.n, 0);
		assert_eq!(spend.relayed_by, None);

		assert_eq!(block.output_value(), 6_000_000_010);
		block.validate().expect("hashes are well formed");
	}

	#[test]
	fn test_parse_latest_block() {
		let latest: LatestBlock = serde_json::from_str(
			r#"{"hash":"0000000000000000000216c4d3e9ad9d44d4bd5b7d1d2a9b3b4b37b5d3d4b4d3","time":1700000000,"block_index":817000,"height":817000,"txIndexes":[1,2,3]}"#,
		)
		.expect("latest block should parse");
		assert_eq!(latest.block_index, 817000);
	}

	#[test]
	fn test_validate_rejects_malformed_hash() {
		let mut block: Block = serde_json::from_str(BLOCK_JSON).expect("block payload should parse");
		block.tx[1].hash = "not-hex".to_string();
		assert!(matches!(
			block.validate(),
			Err(LedgerError::MalformedPayload(_))
		));

		block.tx[1].hash = "abcd".to_string();
		assert!(matches!(
			block.validate(),
			Err(LedgerError::MalformedPayload(_))
		));
	}
}
