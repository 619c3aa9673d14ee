//! Core domain types for the Velotour engine.
//!
//! Velotour recommends bicycle rides that pass by restaurants. This crate
//! holds the shared vocabulary: route segments, restaurants, catalogued
//! paths, the directed road graph and the traversals over it, plus the
//! store traits every pipeline stage and the runtime matcher are written
//! against.

#![forbid(unsafe_code)]

pub mod geometry;
pub mod graph;
mod path;
mod restaurant;
mod segment;
pub mod store;
mod tolerance;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use geometry::{CoordKey, haversine_distance, polyline_length};
pub use graph::{
    Edge, GraphStore, Node, NodeId, ProximityHit, RoadGraph, TraversalError,
    average_edge_length, find_path_with_length, nodes_within_band,
};
pub use path::{NewPath, Path, PathRestaurant};
pub use restaurant::{Restaurant, type_popularity};
pub use segment::RouteSegment;
pub use store::{
    MemoryStore, PathQuery, PathStore, PointIndex, RestaurantStore, SegmentStore, StoreError,
};
#[cfg(feature = "store-sqlite")]
pub use store::{SqliteStore, SqliteStoreError};
pub use tolerance::{DEFAULT_MAX_HOPS, DistanceBand, HopPolicy, InvalidBand, MatchTolerance};
