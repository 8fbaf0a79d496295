//! Event system for ledger synchronization.
//!
//! The sync engine emits an event for every persisted block, every resolved or skipped spend
//! reference, every fetch retry and every checkpoint. Handlers registered on the
//! [`EventDispatcher`] observe these without being able to affect the sync loop: a failing
//! handler is logged and the remaining handlers still run.

use crate::sync::SyncError;
use crate::sync::resolver::ResolutionOutcome;
use crate::utils::{SATOSHI_DECIMALS, format_amount};

use std::time::Duration;
use tracing::{debug, info};

/// Events that occur during ledger synchronization
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A block and all of its transactions and outputs were persisted
    BlockPersisted {
        index: u64,
        hash: String,
        time: u64,
        transactions: usize,
        outputs: usize,
        value: u64,
    },
    /// A spend reference was resolved against the graph, or skipped
    SpendResolved {
        spending_tx_index: u64,
        reference_tx_index: u64,
        n: u64,
        outcome: ResolutionOutcome,
    },
    /// Fetching a block failed and will be retried after `delay`
    FetchRetry {
        index: u64,
        error: String,
        delay: Duration,
    },
    /// A graph snapshot was written
    CheckpointSaved { height: u64 },
    /// Sync reached the chain head
    SyncCompleted {
        final_index: u64,
        blocks_persisted: u64,
    },
    /// Sync stopped with an error
    SyncError { error: String, recoverable: bool },
}

/// Trait for handling sync events.
///
/// Implementors receive all sync events and can perform side effects.
#[async_trait::async_trait]
pub trait SyncEventHandler: Send + Sync {
    /// Handle a sync event.
    async fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError>;

    /// Get the name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
///
/// Handlers are called in the order they are registered.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Box<dyn SyncEventHandler>>,
}

impl EventDispatcher {
    /// Create a new, empty event dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a new event handler.
    pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatch an event to all registered handlers.
    ///
    /// Errors from handlers are logged, but do not stop other handlers from running.
    pub async fn dispatch(&mut self, event: &SyncEvent) {
        for handler in &mut self.handlers {
            if let Err(e) = handler.handle(event).await {
                tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
            }
        }
    }
}

/// Handler that writes a human-readable line for each persisted block and checkpoint.
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl SyncEventHandler for LoggingEventHandler {
    async fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError> {
        match event {
            SyncEvent::BlockPersisted {
                index,
                hash,
                time,
                transactions,
                outputs,
                value,
            } => {
                let mined_at = i64::try_from(*time)
                    .ok()
                    .and_then(|t| chrono::DateTime::from_timestamp(t, 0))
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| time.to_string());
                debug!(
                    "Block {} ({}) mined {}: {} transactions, {} outputs, {} BTC",
                    index,
                    hash,
                    mined_at,
                    transactions,
                    outputs,
                    format_amount(*value, SATOSHI_DECIMALS)
                );
            }
            SyncEvent::SpendResolved {
                spending_tx_index,
                reference_tx_index,
                n,
                outcome: ResolutionOutcome::Skipped(reason),
            } => {
                debug!(
                    "Transaction {} input {}:{} left unresolved ({})",
                    spending_tx_index, reference_tx_index, n, reason
                );
            }
            SyncEvent::CheckpointSaved { height } => {
                info!("Checkpoint written at block {}", height);
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingEventHandler"
    }
}
