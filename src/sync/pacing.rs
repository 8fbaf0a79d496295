//! Request pacing and failure backoff.
//!
//! The engine never sleeps directly: every wait goes through a [`Pacer`], and retry delays are
//! drawn from a [`backoff::backoff::Backoff`] policy. Production code uses [`TokioPacer`], which
//! can be interrupted through a shutdown watch channel; tests inject a recording pacer.

use crate::sync::SyncError;
use backoff::backoff::{Backoff, Constant};
use std::fmt;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Why the engine is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
	/// Fixed spacing between consecutive requests to the ledger source.
	Pacing,
	/// Delay before retrying a failed block fetch.
	Backoff,
}

impl fmt::Display for WaitReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			WaitReason::Pacing => f.write_str("pacing wait"),
			WaitReason::Backoff => f.write_str("backoff wait"),
		}
	}
}

/// Timing configuration for the sync loop
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Delay applied after every loop iteration, successful or not
	pub pacing_interval: Duration,
	/// Delay applied before retrying a failed block fetch
	pub retry_interval: Duration,
	/// Log progress every N persisted blocks
	pub progress_log_interval: u64,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			pacing_interval: Duration::from_secs(2),
			retry_interval: Duration::from_secs(30),
			progress_log_interval: 100,
		}
	}
}

impl SyncConfig {
	/// Retry policy matching this configuration: a constant delay that never gives up.
	pub fn retry_policy(&self) -> Box<dyn Backoff + Send> {
		Box::new(Constant::new(self.retry_interval))
	}
}

/// Performs the timed waits of the sync loop.
#[async_trait::async_trait]
pub trait Pacer: Send {
	/// Wait for `delay`, or fail with [`SyncError::Interrupted`] if shutdown is requested.
	async fn wait(&mut self, delay: Duration, reason: WaitReason) -> Result<(), SyncError>;
}

/// Pacer backed by the Tokio timer and a shutdown signal.
pub struct TokioPacer {
	shutdown: watch::Receiver<bool>,
}

impl TokioPacer {
	/// Create a pacer that aborts its waits once `true` is sent on the shutdown channel.
	pub fn new(shutdown: watch::Receiver<bool>) -> Self {
		Self { shutdown }
	}
}

#[async_trait::async_trait]
impl Pacer for TokioPacer {
	async fn wait(&mut self, delay: Duration, reason: WaitReason) -> Result<(), SyncError> {
		debug!("Starting {} of {:?}", reason, delay);
		let deadline = Instant::now() + delay;

		loop {
			if *self.shutdown.borrow_and_update() {
				return Err(SyncError::Interrupted(reason));
			}

			tokio::select! {
				_ = tokio::time::sleep_until(deadline) => return Ok(()),
				changed = self.shutdown.changed() => {
					if changed.is_err() {
						// Sender gone, nobody can request shutdown any more
						tokio::time::sleep_until(deadline).await;
						return Ok(());
					}
				}
			}
		}
	}
}
