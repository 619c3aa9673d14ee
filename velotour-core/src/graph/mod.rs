//! Directed road graph.
//!
//! Nodes are unique coordinates; edges follow route segments from their
//! first to their last vertex. [`GraphStore`] abstracts persistence so the
//! catalog pipeline can run against SQLite or against the in-memory
//! [`RoadGraph`].

use std::fmt;

use geo::Coord;

use crate::store::StoreError;

mod memory;
mod traversal;

pub use memory::RoadGraph;
pub use traversal::{ProximityHit, TraversalError, find_path_with_length, nodes_within_band};

/// Identifier of a graph node within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

/// A graph node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub location: Coord<f64>,
}

/// A directed edge contributed by one route segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    /// Segment length in metres.
    pub distance: f64,
    /// Route segment that contributed this edge.
    pub segment_id: u64,
}

/// Persistent storage for the road graph.
///
/// Implementations guarantee at most one edge per ordered `(source, target)`
/// pair and one node per exact coordinate.
pub trait GraphStore {
    /// Node located exactly at `location`, if any.
    fn find_node(&self, location: Coord<f64>) -> Result<Option<NodeId>, StoreError>;

    /// Create a node at `location` and return its identifier.
    ///
    /// Callers look the coordinate up with [`GraphStore::find_node`] first.
    fn insert_node(&mut self, location: Coord<f64>) -> Result<NodeId, StoreError>;

    /// Coordinate of node `id`, if it exists.
    fn node_location(&self, id: NodeId) -> Result<Option<Coord<f64>>, StoreError>;

    /// Whether an edge `source → target` already exists.
    fn has_edge(&self, source: NodeId, target: NodeId) -> Result<bool, StoreError>;

    /// Persist `edge`.
    ///
    /// Fails with [`StoreError::DuplicateEdge`] when the ordered pair is taken.
    fn insert_edge(&mut self, edge: Edge) -> Result<(), StoreError>;

    /// Outgoing edges of `source`, ordered by target node id.
    fn outgoing(&self, source: NodeId) -> Result<Vec<Edge>, StoreError>;

    /// Every node, ordered by id.
    fn nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// Every edge, ordered by `(source, target)`.
    fn edges(&self) -> Result<Vec<Edge>, StoreError>;

    /// Number of nodes.
    fn node_count(&self) -> Result<usize, StoreError>;

    /// Number of edges.
    fn edge_count(&self) -> Result<usize, StoreError>;
}

/// Mean edge distance, or `None` for an edgeless graph.
pub fn average_edge_length<G>(graph: &G) -> Result<Option<f64>, StoreError>
where
    G: GraphStore + ?Sized,
{
    let edges = graph.edges()?;
    if edges.is_empty() {
        return Ok(None);
    }
    let total: f64 = edges.iter().map(|edge| edge.distance).sum();
    let count = edges.len() as f64;
    Ok(Some(total / count))
}
