//! Offline pipeline that turns a road network and a restaurant list into a
//! catalogue of ready-to-serve bicycle paths.
//!
//! The stages run strictly in order, each one completing before the next:
//! - [`build_road_graph`] derives one node per segment endpoint and one edge
//!   per segment.
//! - [`link_restaurants`] records the restaurants near each segment.
//! - [`build_catalog`] samples starting points and walks the graph for every
//!   target distance, storing each in-band end node as a new path.
//! - [`resolve_path_routes`] recovers the ordered segments of each path.
//! - [`resolve_path_restaurants`] attaches the restaurants along each route.
//!
//! Every stage only processes unfinished entities, so an interrupted run
//! resumes where it stopped.
//!
//! # Examples
//!
//! ```
//! use geo::LineString;
//! use velotour_catalog::{
//!     CatalogConfig, LinkerConfig, TargetDistances, build_catalog, build_road_graph,
//!     link_restaurants, resolve_path_restaurants, resolve_path_routes,
//! };
//! use velotour_core::{MemoryStore, Restaurant, RoadGraph, RouteSegment};
//!
//! let mut store = MemoryStore::new(
//!     [
//!         RouteSegment::measured(1, LineString::from(vec![(0.0, 0.0), (0.01, 0.0)])),
//!         RouteSegment::measured(2, LineString::from(vec![(0.01, 0.0), (0.02, 0.0)])),
//!     ],
//!     [Restaurant::new(1, (0.0, 0.0).into(), "bistro", "Chez Nous")],
//! );
//! let mut graph = RoadGraph::new();
//! build_road_graph(&store, &mut graph, 500).unwrap();
//! link_restaurants(&mut store, &LinkerConfig::default()).unwrap();
//!
//! let config = CatalogConfig {
//!     grid_resolution: 1,
//!     targets: TargetDistances::List(vec![2_200.0]),
//!     ..CatalogConfig::default()
//! };
//! let report = build_catalog(&mut store, &graph, &config).unwrap();
//! assert_eq!(report.paths_inserted, 1);
//!
//! resolve_path_routes(&mut store, &graph, config.hops, 500).unwrap();
//! resolve_path_restaurants(&mut store, 500).unwrap();
//! assert!(store.paths().all(|path| path.is_matchable()));
//! ```

#![forbid(unsafe_code)]

mod catalog;
mod config;
mod error;
mod graph_builder;
mod linker;
mod progress;
mod restaurants;
mod routes;
mod stats;

pub use catalog::{CatalogReport, build_catalog, sample_starting_points};
pub use config::{
    CatalogConfig, DEFAULT_GRID_RESOLUTION, DEFAULT_LINK_RADIUS_M, DEFAULT_PROGRESS_INTERVAL,
    LinkerConfig, TargetDistances,
};
pub use error::PipelineError;
pub use graph_builder::{GraphBuildReport, build_road_graph};
pub use linker::{LinkReport, link_restaurants};
pub use restaurants::{RestaurantResolutionReport, resolve_path_restaurants};
pub use routes::{ROUTE_LENGTH_EPSILON_M, RouteResolutionReport, resolve_path_routes};
pub use stats::{DatasetStats, dataset_stats};
