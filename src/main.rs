use ledger_graph_sync::config::Config;
use ledger_graph_sync::graph::MemoryGraphStore;
use ledger_graph_sync::graph::snapshot::{FileSnapshotRepository, SnapshotRepository};
use ledger_graph_sync::ledger::BlockchainInfoClient;
use ledger_graph_sync::sync::{LoggingEventHandler, SyncEngine, TokioPacer};

use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	// RUST_LOG overrides the default info level
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::builder()
				.with_default_directive(tracing::Level::INFO.into())
				.from_env_lossy(),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting ledger graph sync");

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			std::process::exit(2);
		}
	};

	let client = match BlockchainInfoClient::new(config.api_url.clone(), config.http_timeout) {
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create ledger client: {}", e);
			std::process::exit(1);
		}
	};

	info!("Created ledger client for {}", config.api_url);

	let repository = FileSnapshotRepository::new(config.data_dir.clone());
	let store = match SnapshotRepository::<MemoryGraphStore>::load_latest(&repository).await {
		Ok(Some((store, height))) => {
			info!("Restored graph snapshot at block {}", height);
			store
		}
		Ok(None) => {
			info!(
				"No snapshot found in {:?}, starting from an empty graph",
				config.data_dir
			);
			MemoryGraphStore::new()
		}
		Err(e) => {
			error!("Failed to restore graph snapshot: {}", e);
			std::process::exit(1);
		}
	};

	// Ctrl-C interrupts the next pacing or backoff wait
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	tokio::spawn(async move {
		match tokio::signal::ctrl_c().await {
			Ok(()) => {
				warn!("Shutdown requested, stopping at the next block boundary");
				let _ = shutdown_tx.send(true);
			}
			Err(e) => error!("Failed to listen for shutdown signal: {}", e),
		}
	});

	let mut engine = SyncEngine::new(
		store,
		client,
		TokioPacer::new(shutdown_rx),
		config.sync.clone(),
	)
	.with_resolver_mode(config.resolver_mode)
	.with_snapshots(Box::new(repository), config.checkpoints.clone());
	engine.register_handler(Box::new(LoggingEventHandler));

	match engine.sync_to_latest().await {
		Ok(stats) => info!("Sync finished at block {}", stats.highest_processed_index),
		Err(e) => {
			error!("Sync failed: {}", e);
			std::process::exit(1);
		}
	}
}
