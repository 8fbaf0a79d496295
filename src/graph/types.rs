use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque handle to a persisted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub(crate) u64);

impl fmt::Display for NodeHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "node#{}", self.0)
	}
}

/// Opaque handle to a persisted edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeHandle(pub(crate) u64);

/// Relationship types of the ledger graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
	/// Block -> predecessor block (or anchor)
	Succeeds,
	/// Transaction -> owning block
	From,
	/// Transaction -> output it created
	Sent,
	/// Output -> transaction that spends it
	Received,
}

impl Relationship {
	pub fn as_str(&self) -> &'static str {
		match self {
			Relationship::Succeeds => "succeeds",
			Relationship::From => "from",
			Relationship::Sent => "sent",
			Relationship::Received => "received",
		}
	}
}

impl fmt::Display for Relationship {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Edge direction relative to the node being inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Outgoing,
	Incoming,
	Both,
}

/// A scalar property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
	UInt(u64),
	Bool(bool),
	Text(String),
}

impl PropertyValue {
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			PropertyValue::UInt(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			PropertyValue::Text(v) => Some(v),
			_ => None,
		}
	}
}

impl From<u64> for PropertyValue {
	fn from(value: u64) -> Self {
		PropertyValue::UInt(value)
	}
}

impl From<u32> for PropertyValue {
	fn from(value: u32) -> Self {
		PropertyValue::UInt(u64::from(value))
	}
}

impl From<bool> for PropertyValue {
	fn from(value: bool) -> Self {
		PropertyValue::Bool(value)
	}
}

impl From<String> for PropertyValue {
	fn from(value: String) -> Self {
		PropertyValue::Text(value)
	}
}

impl From<&str> for PropertyValue {
	fn from(value: &str) -> Self {
		PropertyValue::Text(value.to_string())
	}
}

/// Property map attached to nodes and edges.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Unsigned integer property `key` of `properties`, if present.
pub fn property_u64(properties: &Properties, key: &str) -> Option<u64> {
	properties.get(key).and_then(PropertyValue::as_u64)
}

/// Text property `key` of `properties`, if present.
pub fn property_str<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
	properties.get(key).and_then(PropertyValue::as_str)
}

/// A persisted, typed edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
	pub id: EdgeHandle,
	pub from: NodeHandle,
	pub to: NodeHandle,
	pub relationship: Relationship,
	pub properties: Properties,
}

impl Edge {
	/// The endpoint opposite to `node`.
	pub fn other(&self, node: NodeHandle) -> NodeHandle {
		if self.from == node { self.to } else { self.from }
	}
}

/// Error types for graph storage and snapshot operations
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
	#[error("Unknown node: {0}")]
	UnknownNode(NodeHandle),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Snapshot error: {0}")]
	SnapshotError(String),

	#[error("Corrupted graph: {0}")]
	Corrupted(String),
}
