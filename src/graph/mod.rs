//! Property graph storage for the ingested ledger.
//!
//! The sync engine talks to the graph through the [`GraphStore`] trait: node and edge creation,
//! adjacency queries, and lazy traversals. [`MemoryGraphStore`] is the in-process implementation
//! shipped with the crate, and [`snapshot`] makes it durable across runs.
//!
//! Relationships between ledger entities:
//! - blocks `succeeds` their predecessor block (or the anchor)
//! - transactions are `from` the block that contains them
//! - transactions `sent` money to output nodes
//! - output nodes were `received` by the transaction that spends them

/// In-memory adjacency-list store
pub mod memory;
/// File-backed snapshots of a store
pub mod snapshot;
/// Lazy breadth-first and depth-first traversals
pub mod traversal;
/// Node, edge and property types
pub mod types;

pub use memory::MemoryGraphStore;
pub use traversal::{Traversal, TraversalOrder};
pub use types::*;

/// Node and edge primitives exposed by a backing property graph.
///
/// Writes are visible to every subsequent read on the same store. Implementations perform no
/// retries; errors are reported to the caller as-is.
pub trait GraphStore: Send {
	/// The synthetic root node standing in for "no predecessor".
	fn anchor(&self) -> NodeHandle;

	/// Create a node carrying the given properties.
	fn create_node(&mut self, properties: Properties) -> Result<NodeHandle, GraphError>;

	/// Create a typed edge between two existing nodes.
	fn create_edge(
		&mut self,
		from: NodeHandle,
		to: NodeHandle,
		relationship: Relationship,
		properties: Properties,
	) -> Result<EdgeHandle, GraphError>;

	/// Properties of an existing node.
	fn node(&self, node: NodeHandle) -> Result<&Properties, GraphError>;

	/// Edges attached to `node` in the given direction, optionally restricted to one relationship.
	fn edges<'a>(
		&'a self,
		node: NodeHandle,
		direction: Direction,
		relationship: Option<Relationship>,
	) -> Box<dyn Iterator<Item = &'a Edge> + 'a>;

	fn node_count(&self) -> usize;

	fn edge_count(&self) -> usize;

	/// Whether `node` has at least one matching edge.
	fn has_edge(
		&self,
		node: NodeHandle,
		direction: Direction,
		relationship: Option<Relationship>,
	) -> bool {
		self.edges(node, direction, relationship).next().is_some()
	}

	/// Lazily walk the graph from `start`, yielding `start` first and every reachable node once.
	fn traverse(
		&self,
		start: NodeHandle,
		order: TraversalOrder,
		direction: Direction,
		relationship: Option<Relationship>,
	) -> Traversal<'_, Self>
	where
		Self: Sized,
	{
		Traversal::new(self, start, order, direction, relationship)
	}
}
