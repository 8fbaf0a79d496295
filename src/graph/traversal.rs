//! Lazy graph traversals.
//!
//! A [`Traversal`] expands the frontier one node at a time as it is iterated, so callers that stop
//! at the first match never pay for the rest of the graph.

use super::{Direction, GraphStore, NodeHandle, Relationship};
use std::collections::{HashSet, VecDeque};

/// Order in which a traversal expands its frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
	BreadthFirst,
	DepthFirst,
}

/// Iterator over the nodes reachable from a start node.
///
/// Every node is yielded at most once, starting with the start node itself.
pub struct Traversal<'a, G: GraphStore + ?Sized> {
	store: &'a G,
	order: TraversalOrder,
	direction: Direction,
	relationship: Option<Relationship>,
	frontier: VecDeque<NodeHandle>,
	visited: HashSet<NodeHandle>,
}

impl<'a, G: GraphStore + ?Sized> Traversal<'a, G> {
	pub fn new(
		store: &'a G,
		start: NodeHandle,
		order: TraversalOrder,
		direction: Direction,
		relationship: Option<Relationship>,
	) -> Self {
		let mut visited = HashSet::new();
		visited.insert(start);

		Self {
			store,
			order,
			direction,
			relationship,
			frontier: VecDeque::from([start]),
			visited,
		}
	}
}

impl<G: GraphStore + ?Sized> Iterator for Traversal<'_, G> {
	type Item = NodeHandle;

	fn next(&mut self) -> Option<Self::Item> {
		let node = match self.order {
			TraversalOrder::BreadthFirst => self.frontier.pop_front()?,
			TraversalOrder::DepthFirst => self.frontier.pop_back()?,
		};

		for edge in self.store.edges(node, self.direction, self.relationship) {
			let next = edge.other(node);
			if self.visited.insert(next) {
				self.frontier.push_back(next);
			}
		}

		Some(node)
	}
}
