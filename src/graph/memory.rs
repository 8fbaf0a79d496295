//! In-memory property graph.
//!
//! Nodes and edges live in insertion-ordered vectors and every node keeps the list of edges that
//! touch it, so adjacency queries never scan the whole graph. The store is `serde`-serializable,
//! which is what the snapshot repository persists.

use super::{
	Direction, Edge, EdgeHandle, GraphError, GraphStore, NodeHandle, Properties, Relationship,
};
use serde::{Deserialize, Serialize};

/// Adjacency-list property graph held in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryGraphStore {
	/// Node properties, indexed by node id. Node 0 is the anchor.
	nodes: Vec<Properties>,
	/// All edges, indexed by edge id.
	edges: Vec<Edge>,
	/// Edge ids touching each node, in creation order.
	adjacency: Vec<Vec<EdgeHandle>>,
}

impl MemoryGraphStore {
	/// Create an empty graph containing only the anchor node.
	pub fn new() -> Self {
		Self {
			nodes: vec![Properties::new()],
			edges: Vec::new(),
			adjacency: vec![Vec::new()],
		}
	}

	fn check_node(&self, node: NodeHandle) -> Result<usize, GraphError> {
		let idx = node.0 as usize;
		if idx < self.nodes.len() {
			Ok(idx)
		} else {
			Err(GraphError::UnknownNode(node))
		}
	}

	/// All edges of a relationship type, in creation order.
	pub fn edges_of(&self, relationship: Relationship) -> impl Iterator<Item = &Edge> {
		self.edges
			.iter()
			.filter(move |edge| edge.relationship == relationship)
	}
}

impl Default for MemoryGraphStore {
	fn default() -> Self {
		Self::new()
	}
}

impl GraphStore for MemoryGraphStore {
	fn anchor(&self) -> NodeHandle {
		NodeHandle(0)
	}

	fn create_node(&mut self, properties: Properties) -> Result<NodeHandle, GraphError> {
		let handle = NodeHandle(self.nodes.len() as u64);
		self.nodes.push(properties);
		self.adjacency.push(Vec::new());
		Ok(handle)
	}

	fn create_edge(
		&mut self,
		from: NodeHandle,
		to: NodeHandle,
		relationship: Relationship,
		properties: Properties,
	) -> Result<EdgeHandle, GraphError> {
		let from_idx = self.check_node(from)?;
		let to_idx = self.check_node(to)?;

		let handle = EdgeHandle(self.edges.len() as u64);
		self.edges.push(Edge {
			id: handle,
			from,
			to,
			relationship,
			properties,
		});

		self.adjacency[from_idx].push(handle);
		if to_idx != from_idx {
			self.adjacency[to_idx].push(handle);
		}

		Ok(handle)
	}

	fn node(&self, node: NodeHandle) -> Result<&Properties, GraphError> {
		let idx = self.check_node(node)?;
		Ok(&self.nodes[idx])
	}

	fn edges<'a>(
		&'a self,
		node: NodeHandle,
		direction: Direction,
		relationship: Option<Relationship>,
	) -> Box<dyn Iterator<Item = &'a Edge> + 'a> {
		let Some(adjacent) = self.adjacency.get(node.0 as usize) else {
			return Box::new(std::iter::empty());
		};

		Box::new(
			adjacent
				.iter()
				.map(move |handle| &self.edges[handle.0 as usize])
				.filter(move |edge| relationship.is_none_or(|r| edge.relationship == r))
				.filter(move |edge| match direction {
					Direction::Outgoing => edge.from == node,
					Direction::Incoming => edge.to == node,
					Direction::Both => true,
				}),
		)
	}

	fn node_count(&self) -> usize {
		self.nodes.len()
	}

	fn edge_count(&self) -> usize {
		self.edges.len()
	}
}
