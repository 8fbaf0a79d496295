//!
//! HTTP client for the blockchain.info JSON API.
//!
//! This module provides an async client that reports the current chain head and fetches
//! individual blocks by their sequential index. All methods are async and designed for use
//! with Tokio. The client performs no retries; transient failures are reported to the caller.

use super::types::*;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout applied to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// blockchain.info ledger API client
#[derive(Clone)]
pub struct BlockchainInfoClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// The base URL of the API, without a trailing slash.
	base_url: String,
}

impl BlockchainInfoClient {
	/// Create a new ledger API client.
	///
	/// # Arguments
	/// * `base_url` - The API root, e.g. `https://blockchain.info`.
	/// * `timeout` - Timeout applied to every request.
	///
	/// # Returns
	/// A new `BlockchainInfoClient`, or an `LedgerError` if the HTTP client cannot be built.
	pub fn new(base_url: String, timeout: Duration) -> Result<Self, LedgerError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	fn latest_block_url(&self) -> String {
		format!("{}/latestblock", self.base_url)
	}

	fn block_url(&self, index: u64) -> String {
		format!("{}/block-index/{}?format=json", self.base_url, index)
	}

	/// Issue a GET request and decode the JSON body.
	///
	/// # Arguments
	/// * `url` - The full request URL.
	///
	/// # Returns
	/// The decoded body, or an `LedgerError` if the request or decoding fails.
	async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, LedgerError> {
		debug!("GET {}", url);

		let response = self.http_client.get(url).send().await?;
		ensure_success(response.status())?;

		let body = response.text().await?;
		Ok(serde_json::from_str(&body)?)
	}

	/// Fetch the chain head summary.
	pub async fn latest_block(&self) -> Result<LatestBlock, LedgerError> {
		self.get_json(&self.latest_block_url()).await
	}
}

fn ensure_success(status: StatusCode) -> Result<(), LedgerError> {
	if status.is_success() {
		Ok(())
	} else {
		Err(LedgerError::HttpStatus(status))
	}
}

#[async_trait::async_trait]
impl LedgerSource for BlockchainInfoClient {
	async fn latest_height(&self) -> Result<u64, LedgerError> {
		let latest = self
			.latest_block()
			.await
			.map_err(|e| LedgerError::SourceUnavailable(e.to_string()))?;

		info!(
			"Chain head is block {} (height {}, hash {})",
			latest.block_index, latest.height, latest.hash
		);
		Ok(latest.block_index)
	}

	async fn block(&self, index: u64) -> Result<Block, LedgerError> {
		let block: Block = self
			.get_json(&self.block_url(index))
			.await
			.map_err(|e| LedgerError::FetchFailed {
				index,
				reason: e.to_string(),
			})?;

		block.validate().map_err(|e| LedgerError::FetchFailed {
			index,
			reason: e.to_string(),
		})?;

		debug!(
			"Fetched block {} ({}) with {} transactions",
			index,
			block.hash,
			block.tx.len()
		);
		Ok(block)
	}
}
