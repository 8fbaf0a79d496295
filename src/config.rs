//! Runtime configuration read from environment variables.
//!
//! Every setting has a default, so an empty environment yields a working configuration against
//! the public blockchain.info API. Blank values count as unset.

use crate::graph::snapshot::CheckpointConfig;
use crate::ledger::DEFAULT_REQUEST_TIMEOUT;
use crate::sync::{LookupMode, SyncConfig};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const LEDGER_API_URL_ENV: &str = "LEDGER_API_URL";
pub const LEDGER_HTTP_TIMEOUT_ENV: &str = "LEDGER_HTTP_TIMEOUT_SECS";
pub const GRAPH_DATA_DIR_ENV: &str = "GRAPH_DATA_DIR";
pub const SYNC_PACING_ENV: &str = "SYNC_PACING_MS";
pub const SYNC_RETRY_DELAY_ENV: &str = "SYNC_RETRY_DELAY_SECS";
pub const SYNC_CHECKPOINT_INTERVAL_ENV: &str = "SYNC_CHECKPOINT_INTERVAL";
pub const SYNC_CHECKPOINT_KEEP_ENV: &str = "SYNC_CHECKPOINT_KEEP";
pub const SYNC_RESOLVER_MODE_ENV: &str = "SYNC_RESOLVER_MODE";

const DEFAULT_API_URL: &str = "https://blockchain.info";
const DEFAULT_DATA_DIR: &str = "./data";

/// Error types for configuration loading
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("Invalid value {value:?} for {key}")]
	Invalid { key: &'static str, value: String },
}

/// Settings for one run of the binary.
#[derive(Debug, Clone)]
pub struct Config {
	pub api_url: String,
	pub http_timeout: Duration,
	/// Directory holding graph snapshots
	pub data_dir: PathBuf,
	pub sync: SyncConfig,
	pub checkpoints: CheckpointConfig,
	pub resolver_mode: LookupMode,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			api_url: DEFAULT_API_URL.to_string(),
			http_timeout: DEFAULT_REQUEST_TIMEOUT,
			data_dir: PathBuf::from(DEFAULT_DATA_DIR),
			sync: SyncConfig::default(),
			checkpoints: CheckpointConfig::default(),
			resolver_mode: LookupMode::default(),
		}
	}
}

impl Config {
	/// Load the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Load the configuration from an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| {
			lookup(key)
				.map(|value| value.trim().to_string())
				.filter(|value| !value.is_empty())
		};

		let mut config = Config::default();

		if let Some(url) = get(LEDGER_API_URL_ENV) {
			config.api_url = url;
		}
		if let Some(secs) = parse(LEDGER_HTTP_TIMEOUT_ENV, get(LEDGER_HTTP_TIMEOUT_ENV))? {
			config.http_timeout = Duration::from_secs(secs);
		}
		if let Some(dir) = get(GRAPH_DATA_DIR_ENV) {
			config.data_dir = PathBuf::from(dir);
		}
		if let Some(ms) = parse(SYNC_PACING_ENV, get(SYNC_PACING_ENV))? {
			config.sync.pacing_interval = Duration::from_millis(ms);
		}
		if let Some(secs) = parse(SYNC_RETRY_DELAY_ENV, get(SYNC_RETRY_DELAY_ENV))? {
			config.sync.retry_interval = Duration::from_secs(secs);
		}
		if let Some(interval) = parse(
			SYNC_CHECKPOINT_INTERVAL_ENV,
			get(SYNC_CHECKPOINT_INTERVAL_ENV),
		)? {
			config.checkpoints.interval = interval;
		}
		if let Some(keep) = parse(SYNC_CHECKPOINT_KEEP_ENV, get(SYNC_CHECKPOINT_KEEP_ENV))? {
			config.checkpoints.keep_count = keep;
		}
		if let Some(mode) = get(SYNC_RESOLVER_MODE_ENV) {
			config.resolver_mode = match mode.to_ascii_lowercase().as_str() {
				"indexed" => LookupMode::Indexed,
				"traversal" => LookupMode::Traversal,
				_ => {
					return Err(ConfigError::Invalid {
						key: SYNC_RESOLVER_MODE_ENV,
						value: mode,
					});
				}
			};
		}

		Ok(config)
	}
}

fn parse<T: FromStr>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
	value
		.map(|value| {
			value
				.parse::<T>()
				.map_err(|_| ConfigError::Invalid { key, value })
		})
		.transpose()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		Config::from_lookup(|key| vars.get(key).cloned())
	}

	#[test]
	fn test_defaults() {
		let config = load(&[]).unwrap();
		assert_eq!(config.api_url, "https://blockchain.info");
		assert_eq!(config.http_timeout, Duration::from_secs(30));
		assert_eq!(config.data_dir, PathBuf::from("./data"));
		assert_eq!(config.sync.pacing_interval, Duration::from_secs(2));
		assert_eq!(config.sync.retry_interval, Duration::from_secs(30));
		assert_eq!(config.checkpoints.interval, 100);
		assert_eq!(config.checkpoints.keep_count, 2);
		assert_eq!(config.resolver_mode, LookupMode::Indexed);
	}

	#[test]
	fn test_overrides() {
		let config = load(&[
			(LEDGER_API_URL_ENV, "http://localhost:8080"),
			(SYNC_PACING_ENV, "250"),
			(SYNC_RETRY_DELAY_ENV, " 5 "),
			(SYNC_CHECKPOINT_INTERVAL_ENV, "10"),
			(SYNC_RESOLVER_MODE_ENV, "Traversal"),
			(GRAPH_DATA_DIR_ENV, ""),
		])
		.unwrap();

		assert_eq!(config.api_url, "http://localhost:8080");
		assert_eq!(config.sync.pacing_interval, Duration::from_millis(250));
		assert_eq!(config.sync.retry_interval, Duration::from_secs(5));
		assert_eq!(config.checkpoints.interval, 10);
		assert_eq!(config.resolver_mode, LookupMode::Traversal);
		assert_eq!(config.data_dir, PathBuf::from("./data"));
	}

	#[test]
	fn test_invalid_values_are_rejected() {
		assert_eq!(
			load(&[(SYNC_PACING_ENV, "fast")]).unwrap_err(),
			ConfigError::Invalid {
				key: SYNC_PACING_ENV,
				value: "fast".to_string()
			}
		);
		assert!(matches!(
			load(&[(SYNC_RESOLVER_MODE_ENV, "magic")]),
			Err(ConfigError::Invalid {
				key: SYNC_RESOLVER_MODE_ENV,
				..
			})
		));
	}
}
