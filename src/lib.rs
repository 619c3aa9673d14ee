//! Facade crate for the Velotour ride recommendation engine.
//!
//! This crate re-exports the core domain types and exposes the offline
//! catalogue pipeline, the runtime matcher and the SQLite-backed dataset
//! loader behind feature flags.

#![forbid(unsafe_code)]

pub use velotour_core::{
    DistanceBand, Edge, GraphStore, HopPolicy, MatchTolerance, MemoryStore, NewPath, Node,
    NodeId, Path, PathQuery, PathRestaurant, PathStore, Restaurant, RestaurantStore, RoadGraph,
    RouteSegment, SegmentStore, StoreError, TraversalError, find_path_with_length,
    nodes_within_band,
};

#[cfg(feature = "store-sqlite")]
pub use velotour_core::{SqliteStore, SqliteStoreError};

#[cfg(feature = "catalog")]
pub use velotour_catalog::{
    CatalogConfig, LinkerConfig, PipelineError, TargetDistances, build_catalog, build_road_graph,
    dataset_stats, link_restaurants, resolve_path_restaurants, resolve_path_routes,
};

#[cfg(feature = "matcher")]
pub use velotour_matcher::{
    FeatureCollection, MatchError, MatcherConfig, PathRequest, RuntimeMatcher,
    StartingPointRequest, StartingPointResponse, ValidationError,
};

#[cfg(feature = "store-sqlite")]
pub use velotour_data::{Dataset, DatasetError, SeedError, seed_database, seed_from_files};
