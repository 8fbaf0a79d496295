//! Durable snapshots of a graph store.
//!
//! Snapshots are written at block boundaries only, so a restored graph never contains a partially
//! ingested block. Each snapshot is a `bincode` body plus a JSON metadata sidecar recording the
//! block index it was taken at.

use crate::graph::{GraphError, GraphStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SNAPSHOT_PREFIX: &str = "graph_snapshot_height_";
const SNAPSHOT_SUFFIX: &str = ".bin";
const METADATA_SUFFIX: &str = ".meta.json";

/// Repository for graph snapshots
#[async_trait::async_trait]
pub trait SnapshotRepository<S: Send + Sync + 'static>: Send + Sync {
	async fn save(&self, store: &S, height: u64) -> Result<(), GraphError>;
	async fn find_latest(&self) -> Result<Option<(PathBuf, u64)>, GraphError>;
	async fn load(&self, path: &Path) -> Result<(S, u64), GraphError>;
	async fn cleanup_old(&self, keep_count: usize) -> Result<(), GraphError>;

	/// Load the most recent snapshot, if any.
	async fn load_latest(&self) -> Result<Option<(S, u64)>, GraphError> {
		match self.find_latest().await? {
			Some((path, _)) => Ok(Some(self.load(&path).await?)),
			None => Ok(None),
		}
	}
}

/// File-based implementation of SnapshotRepository
pub struct FileSnapshotRepository {
	data_dir: PathBuf,
}

impl FileSnapshotRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn get_snapshot_filename(&self, height: u64) -> PathBuf {
		self.data_dir
			.join(format!("{}{}{}", SNAPSHOT_PREFIX, height, SNAPSHOT_SUFFIX))
	}

	fn get_metadata_filename(&self, height: u64) -> PathBuf {
		self.data_dir
			.join(format!("{}{}{}", SNAPSHOT_PREFIX, height, METADATA_SUFFIX))
	}

	async fn list_snapshots(&self) -> Result<Vec<(PathBuf, u64)>, GraphError> {
		let mut snapshots = Vec::new();

		let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(snapshots),
			Err(e) => return Err(e.into()),
		};

		while let Some(entry) = entries.next_entry().await? {
			let path = entry.path();
			if let Some(height) = path
				.file_name()
				.and_then(|f| f.to_str())
				.and_then(parse_snapshot_height)
			{
				snapshots.push((path, height));
			}
		}

		Ok(snapshots)
	}
}

fn parse_snapshot_height(filename: &str) -> Option<u64> {
	filename
		.strip_prefix(SNAPSHOT_PREFIX)
		.and_then(|s| s.strip_suffix(SNAPSHOT_SUFFIX))
		.and_then(|s| s.parse::<u64>().ok())
}

#[async_trait::async_trait]
impl<S> SnapshotRepository<S> for FileSnapshotRepository
where
	S: GraphStore + Serialize + DeserializeOwned + Sync + 'static,
{
	async fn save(&self, store: &S, height: u64) -> Result<(), GraphError> {
		tokio::fs::create_dir_all(&self.data_dir).await?;

		let state_bytes = bincode::serialize(store).map_err(|e| {
			GraphError::SnapshotError(format!("Failed to serialize graph: {}", e))
		})?;

		// Write to a temporary file first so a crash never leaves a truncated snapshot behind
		let filename = self.get_snapshot_filename(height);
		let tmp_filename = filename.with_extension("bin.tmp");
		tokio::fs::write(&tmp_filename, &state_bytes).await?;
		tokio::fs::rename(&tmp_filename, &filename).await?;

		let metadata = serde_json::json!({
			"sync_height": height,
			"nodes": store.node_count(),
			"edges": store.edge_count(),
			"timestamp": chrono::Utc::now().to_rfc3339(),
		});
		let metadata_json = serde_json::to_string_pretty(&metadata).map_err(|e| {
			GraphError::SnapshotError(format!("Failed to serialize snapshot metadata: {}", e))
		})?;
		tokio::fs::write(self.get_metadata_filename(height), metadata_json).await?;

		info!(
			"Saved graph snapshot to {:?} at block {} ({} nodes, {} edges)",
			filename,
			height,
			store.node_count(),
			store.edge_count()
		);
		Ok(())
	}

	async fn find_latest(&self) -> Result<Option<(PathBuf, u64)>, GraphError> {
		let snapshots = self.list_snapshots().await?;
		Ok(snapshots.into_iter().max_by_key(|(_, height)| *height))
	}

	async fn load(&self, path: &Path) -> Result<(S, u64), GraphError> {
		let height = path
			.file_name()
			.and_then(|f| f.to_str())
			.and_then(parse_snapshot_height)
			.ok_or_else(|| {
				GraphError::SnapshotError("Invalid snapshot filename format".to_string())
			})?;

		let state_bytes = tokio::fs::read(path).await?;
		let store: S = bincode::deserialize(&state_bytes).map_err(|e| {
			GraphError::SnapshotError(format!("Failed to deserialize graph: {}", e))
		})?;

		info!(
			"Loaded graph snapshot from {:?} at block {} ({} nodes, {} edges)",
			path,
			height,
			store.node_count(),
			store.edge_count()
		);
		Ok((store, height))
	}

	async fn cleanup_old(&self, keep_count: usize) -> Result<(), GraphError> {
		let mut snapshots = self.list_snapshots().await?;

		if snapshots.len() <= keep_count {
			return Ok(());
		}

		// Newest first
		snapshots.sort_by_key(|(_, height)| std::cmp::Reverse(*height));

		for (path, height) in snapshots.into_iter().skip(keep_count) {
			if let Err(e) = tokio::fs::remove_file(&path).await {
				warn!("Failed to remove old snapshot {:?}: {}", path, e);
				continue;
			}
			let _ = tokio::fs::remove_file(self.get_metadata_filename(height)).await;
			info!("Removed old snapshot: {:?}", path);
		}

		Ok(())
	}
}

/// Configuration for snapshot checkpoints.
///
/// This struct controls how often snapshots are saved and how many are retained.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
	/// Save a snapshot every N persisted blocks.
	pub interval: u64,
	/// Number of snapshots to keep.
	pub keep_count: usize,
}

impl Default for CheckpointConfig {
	fn default() -> Self {
		Self {
			interval: 100,
			keep_count: 2,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{MemoryGraphStore, Properties, Relationship};

	fn temp_dir(name: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!(
			"ledger-graph-sync-{}-{}-{}",
			name,
			std::process::id(),
			chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
		));
		std::fs::create_dir_all(&dir).unwrap();
		dir
	}

	fn sample_store() -> MemoryGraphStore {
		let mut store = MemoryGraphStore::new();
		let block = store
			.create_node(Properties::from([("block_index".to_string(), 1u64.into())]))
			.unwrap();
		store
			.create_edge(block, store.anchor(), Relationship::Succeeds, Properties::new())
			.unwrap();
		store
	}

	#[tokio::test]
	async fn test_save_and_load_latest() {
		let dir = temp_dir("roundtrip");
		let repo = FileSnapshotRepository::new(dir.clone());
		let store = sample_store();

		SnapshotRepository::<MemoryGraphStore>::save(&repo, &store, 1).await.unwrap();
		SnapshotRepository::<MemoryGraphStore>::save(&repo, &store, 5).await.unwrap();

		let (restored, height) = SnapshotRepository::<MemoryGraphStore>::load_latest(&repo)
			.await
			.unwrap()
			.expect("snapshot exists");
		assert_eq!(height, 5);
		assert_eq!(restored.node_count(), 2);
		assert_eq!(restored.edge_count(), 1);
		assert!(dir.join("graph_snapshot_height_5.meta.json").exists());

		std::fs::remove_dir_all(dir).ok();
	}

	#[tokio::test]
	async fn test_missing_directory_has_no_snapshot() {
		let repo = FileSnapshotRepository::new(std::env::temp_dir().join("ledger-graph-sync-absent"));
		let latest = SnapshotRepository::<MemoryGraphStore>::load_latest(&repo)
			.await
			.unwrap();
		assert!(latest.is_none());
	}

	#[tokio::test]
	async fn test_cleanup_keeps_newest() {
		let dir = temp_dir("cleanup");
		let repo = FileSnapshotRepository::new(dir.clone());
		let store = sample_store();

		for height in [10, 20, 30] {
			SnapshotRepository::<MemoryGraphStore>::save(&repo, &store, height)
				.await
				.unwrap();
		}
		SnapshotRepository::<MemoryGraphStore>::cleanup_old(&repo, 2).await.unwrap();

		assert!(!dir.join("graph_snapshot_height_10.bin").exists());
		assert!(!dir.join("graph_snapshot_height_10.meta.json").exists());
		assert!(dir.join("graph_snapshot_height_20.bin").exists());
		assert!(dir.join("graph_snapshot_height_30.bin").exists());

		std::fs::remove_dir_all(dir).ok();
	}
}
