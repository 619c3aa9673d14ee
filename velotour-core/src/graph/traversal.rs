//! Bounded depth-first walks over simple paths.
//!
//! Both walks explore simple paths only: no node, including the start, is
//! visited twice on the same branch. A branch is abandoned as soon as its
//! cumulative distance exceeds the upper bound or the hop budget is spent.
//! Outgoing edges are visited in target id order, so results are
//! deterministic for a given graph.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use super::{Edge, GraphStore, NodeId};
use crate::store::StoreError;
use crate::tolerance::{DistanceBand, InvalidBand};

/// Error raised by graph walks.
#[derive(Debug, Error)]
pub enum TraversalError {
    /// The requested distance band was malformed.
    #[error(transparent)]
    InvalidBand(#[from] InvalidBand),
    /// The walk started from a node the graph does not hold.
    #[error("{0} is not part of the road graph")]
    UnknownNode(NodeId),
    /// Reading the graph failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A node reachable from the start node within a distance band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityHit {
    pub node: NodeId,
    /// Smallest in-band cumulative distance found for `node`, in metres.
    pub distance: f64,
}

/// Nodes reachable from `start` along a simple path whose length falls in
/// `band`, using at most `max_hops` edges.
///
/// Every node is reported once with the shortest in-band distance found. The
/// start node is never reported. Results are ordered by node id.
///
/// # Errors
///
/// Returns [`TraversalError::UnknownNode`] when `start` is absent and
/// [`TraversalError::Store`] when the graph cannot be read.
pub fn nodes_within_band<G>(
    graph: &G,
    start: NodeId,
    band: DistanceBand,
    max_hops: usize,
) -> Result<Vec<ProximityHit>, TraversalError>
where
    G: GraphStore + ?Sized,
{
    ensure_node(graph, start)?;
    let mut walk = ProximityWalk {
        graph,
        band,
        max_hops,
        on_branch: HashSet::from([start]),
        best: BTreeMap::new(),
    };
    walk.explore(start, 0.0, 0)?;
    Ok(walk
        .best
        .into_iter()
        .map(|(node, distance)| ProximityHit { node, distance })
        .collect())
}

/// First simple path from `start` to `end` whose length is within
/// `epsilon` metres of `length`, using at most `max_hops` edges.
///
/// Returns the traversed edges in order, or `None` when no such path exists.
/// A path produced by [`nodes_within_band`] with the same hop budget is
/// always found again, because both walks sum edge distances in the same
/// order.
///
/// # Errors
///
/// Returns [`TraversalError::UnknownNode`] when `start` is absent and
/// [`TraversalError::Store`] when the graph cannot be read.
pub fn find_path_with_length<G>(
    graph: &G,
    start: NodeId,
    end: NodeId,
    length: f64,
    max_hops: usize,
    epsilon: f64,
) -> Result<Option<Vec<Edge>>, TraversalError>
where
    G: GraphStore + ?Sized,
{
    ensure_node(graph, start)?;
    if start == end {
        return Ok(None);
    }
    let mut walk = ExactWalk {
        graph,
        end,
        length,
        epsilon,
        max_hops,
        on_branch: HashSet::from([start]),
        trail: Vec::new(),
    };
    if walk.explore(start, 0.0)? {
        Ok(Some(walk.trail))
    } else {
        Ok(None)
    }
}

fn ensure_node<G>(graph: &G, node: NodeId) -> Result<(), TraversalError>
where
    G: GraphStore + ?Sized,
{
    match graph.node_location(node)? {
        Some(_) => Ok(()),
        None => Err(TraversalError::UnknownNode(node)),
    }
}

struct ProximityWalk<'g, G: ?Sized> {
    graph: &'g G,
    band: DistanceBand,
    max_hops: usize,
    on_branch: HashSet<NodeId>,
    best: BTreeMap<NodeId, f64>,
}

impl<G> ProximityWalk<'_, G>
where
    G: GraphStore + ?Sized,
{
    fn explore(&mut self, node: NodeId, travelled: f64, hops: usize) -> Result<(), StoreError> {
        if hops >= self.max_hops {
            return Ok(());
        }
        for edge in self.graph.outgoing(node)? {
            if self.on_branch.contains(&edge.target) {
                continue;
            }
            let reached = travelled + edge.distance;
            if reached > self.band.max() {
                continue;
            }
            if self.band.contains(reached) {
                self.best
                    .entry(edge.target)
                    .and_modify(|best| *best = best.min(reached))
                    .or_insert(reached);
            }
            self.on_branch.insert(edge.target);
            self.explore(edge.target, reached, hops + 1)?;
            self.on_branch.remove(&edge.target);
        }
        Ok(())
    }
}

struct ExactWalk<'g, G: ?Sized> {
    graph: &'g G,
    end: NodeId,
    length: f64,
    epsilon: f64,
    max_hops: usize,
    on_branch: HashSet<NodeId>,
    trail: Vec<Edge>,
}

impl<G> ExactWalk<'_, G>
where
    G: GraphStore + ?Sized,
{
    fn explore(&mut self, node: NodeId, travelled: f64) -> Result<bool, StoreError> {
        if self.trail.len() >= self.max_hops {
            return Ok(false);
        }
        for edge in self.graph.outgoing(node)? {
            if self.on_branch.contains(&edge.target) {
                continue;
            }
            let reached = travelled + edge.distance;
            if reached > self.length + self.epsilon {
                continue;
            }
            self.trail.push(edge);
            if edge.target == self.end {
                // A simple path cannot come back to `end`, so stop here either way.
                if (reached - self.length).abs() <= self.epsilon {
                    return Ok(true);
                }
            } else {
                self.on_branch.insert(edge.target);
                let found = self.explore(edge.target, reached)?;
                self.on_branch.remove(&edge.target);
                if found {
                    return Ok(true);
                }
            }
            self.trail.pop();
        }
        Ok(false)
    }
}
