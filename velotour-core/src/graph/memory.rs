//! In-memory road graph.

use std::collections::{BTreeMap, HashMap};

use geo::Coord;

use super::{Edge, GraphStore, Node, NodeId};
use crate::geometry::{CoordKey, normalise_coord};
use crate::store::StoreError;

/// Road graph held entirely in memory.
///
/// Node ids are dense and assigned in insertion order starting at zero.
/// Outgoing edges are kept per source in a map keyed by target so
/// [`GraphStore::outgoing`] is already ordered.
///
/// Catalog stages that walk the graph many times load a snapshot with
/// [`RoadGraph::from_store`] instead of querying a database per step.
#[derive(Debug, Default, Clone)]
pub struct RoadGraph {
    locations: Vec<Coord<f64>>,
    index: HashMap<CoordKey, NodeId>,
    adjacency: Vec<BTreeMap<NodeId, Edge>>,
    edge_count: usize,
}

impl RoadGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every node and edge of `store` into memory.
    ///
    /// Node ids are renumbered densely; coordinates are preserved exactly.
    pub fn from_store<G>(store: &G) -> Result<Self, StoreError>
    where
        G: GraphStore + ?Sized,
    {
        let mut graph = Self::new();
        let mut remap = HashMap::new();
        for node in store.nodes()? {
            let local = graph.insert_node(node.location)?;
            remap.insert(node.id, local);
        }
        for edge in store.edges()? {
            let (Some(source), Some(target)) = (remap.get(&edge.source), remap.get(&edge.target))
            else {
                return Err(StoreError::NotFound {
                    entity: "node",
                    id: edge.source.0.max(edge.target.0),
                });
            };
            graph.insert_edge(Edge {
                source: *source,
                target: *target,
                ..edge
            })?;
        }
        Ok(graph)
    }

    fn slot(&self, id: NodeId) -> Option<usize> {
        usize::try_from(id.0)
            .ok()
            .filter(|slot| *slot < self.locations.len())
    }
}

impl GraphStore for RoadGraph {
    fn find_node(&self, location: Coord<f64>) -> Result<Option<NodeId>, StoreError> {
        Ok(self.index.get(&CoordKey::new(location)).copied())
    }

    fn insert_node(&mut self, location: Coord<f64>) -> Result<NodeId, StoreError> {
        let key = CoordKey::new(location);
        if let Some(existing) = self.index.get(&key) {
            return Ok(*existing);
        }
        let id = NodeId(self.locations.len() as u64);
        self.locations.push(normalise_coord(location));
        self.adjacency.push(BTreeMap::new());
        self.index.insert(key, id);
        Ok(id)
    }

    fn node_location(&self, id: NodeId) -> Result<Option<Coord<f64>>, StoreError> {
        Ok(self
            .slot(id)
            .and_then(|slot| self.locations.get(slot))
            .copied())
    }

    fn has_edge(&self, source: NodeId, target: NodeId) -> Result<bool, StoreError> {
        Ok(self
            .slot(source)
            .and_then(|slot| self.adjacency.get(slot))
            .is_some_and(|edges| edges.contains_key(&target)))
    }

    fn insert_edge(&mut self, edge: Edge) -> Result<(), StoreError> {
        if self.slot(edge.target).is_none() {
            return Err(StoreError::NotFound {
                entity: "node",
                id: edge.target.0,
            });
        }
        let Some(edges) = self
            .slot(edge.source)
            .and_then(|slot| self.adjacency.get_mut(slot))
        else {
            return Err(StoreError::NotFound {
                entity: "node",
                id: edge.source.0,
            });
        };
        if edges.contains_key(&edge.target) {
            return Err(StoreError::DuplicateEdge {
                from: edge.source,
                to: edge.target,
            });
        }
        edges.insert(edge.target, edge);
        self.edge_count += 1;
        Ok(())
    }

    fn outgoing(&self, source: NodeId) -> Result<Vec<Edge>, StoreError> {
        Ok(self
            .slot(source)
            .and_then(|slot| self.adjacency.get(slot))
            .map(|edges| edges.values().copied().collect())
            .unwrap_or_default())
    }

    fn nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self
            .locations
            .iter()
            .enumerate()
            .map(|(slot, location)| Node {
                id: NodeId(slot as u64),
                location: *location,
            })
            .collect())
    }

    fn edges(&self) -> Result<Vec<Edge>, StoreError> {
        Ok(self
            .adjacency
            .iter()
            .flat_map(|edges| edges.values().copied())
            .collect())
    }

    fn node_count(&self) -> Result<usize, StoreError> {
        Ok(self.locations.len())
    }

    fn edge_count(&self) -> Result<usize, StoreError> {
        Ok(self.edge_count)
    }
}
