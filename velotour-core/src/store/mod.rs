//! Data access traits for segments, restaurants and catalogued paths.
//!
//! Each pipeline stage and the runtime matcher depend only on the traits it
//! needs. [`MemoryStore`] backs tests and small datasets; the `store-sqlite`
//! feature adds [`SqliteStore`], which persists everything in one database.

use std::collections::HashSet;

use geo::{Coord, Rect};
use thiserror::Error;

use crate::geometry::CoordKey;
use crate::graph::NodeId;
use crate::tolerance::DistanceBand;
use crate::{NewPath, Path, PathRestaurant, Restaurant, RouteSegment};

mod memory;
mod spatial_index;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use memory::MemoryStore;
pub use spatial_index::PointIndex;
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreError};

/// Error raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity, e.g. `"segment"`.
        entity: &'static str,
        /// Identifier that failed to resolve.
        id: u64,
    },
    /// The ordered node pair already carries an edge.
    #[error("an edge from {from} to {to} already exists")]
    DuplicateEdge {
        /// Source node of the rejected edge.
        from: NodeId,
        /// Target node of the rejected edge.
        to: NodeId,
    },
    /// The backing storage failed.
    #[error("{operation} failed: {source}")]
    Backend {
        /// Short description of the failed operation.
        operation: &'static str,
        /// Underlying backend error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap a backend-specific error.
    pub fn backend<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }
}

/// Access to route segments.
pub trait SegmentStore {
    /// Every segment, ordered by id.
    fn segments(&self) -> Result<Vec<RouteSegment>, StoreError>;

    /// Segments with the given ids, in the order requested.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::NotFound`] when an id is unknown.
    fn segments_by_id(&self, ids: &[u64]) -> Result<Vec<RouteSegment>, StoreError>;

    /// Replace the linked restaurant ids of segment `id`.
    fn set_linked_restaurants(&mut self, id: u64, restaurants: Vec<u64>)
    -> Result<(), StoreError>;

    /// Start vertex of the segment whose start lies closest to `point`.
    fn nearest_segment_start(&self, point: Coord<f64>) -> Result<Option<Coord<f64>>, StoreError>;
}

/// Access to restaurants.
pub trait RestaurantStore {
    /// Every restaurant, ordered by id.
    fn restaurants(&self) -> Result<Vec<Restaurant>, StoreError>;

    /// Restaurants with the given ids, ordered by id; unknown ids are skipped.
    fn restaurants_by_id(&self, ids: &[u64]) -> Result<Vec<Restaurant>, StoreError>;

    /// Ids of restaurants within `radius_m` metres of `centre`, ascending.
    fn restaurants_within(&self, centre: Coord<f64>, radius_m: f64)
    -> Result<Vec<u64>, StoreError>;

    /// Bounding box of every restaurant, or `None` when there are none.
    fn restaurant_bounds(&self) -> Result<Option<Rect<f64>>, StoreError>;
}

/// Access to the path catalogue.
pub trait PathStore {
    /// Number of catalogued paths.
    fn path_count(&self) -> Result<usize, StoreError>;

    /// Remove every catalogued path.
    fn clear_paths(&mut self) -> Result<(), StoreError>;

    /// Persist new paths, returning their identifiers in input order.
    fn insert_paths(&mut self, paths: &[NewPath]) -> Result<Vec<u64>, StoreError>;

    /// Paths whose routes are unresolved, ordered by id.
    fn paths_without_routes(&self) -> Result<Vec<Path>, StoreError>;

    /// Record the ordered segment ids of path `id`.
    fn set_routes(&mut self, id: u64, routes: Vec<u64>) -> Result<(), StoreError>;

    /// Paths with resolved routes but unresolved restaurants, ordered by id.
    fn paths_without_restaurants(&self) -> Result<Vec<Path>, StoreError>;

    /// Record the restaurants reachable along path `id`.
    fn set_restaurants(
        &mut self,
        id: u64,
        restaurants: Vec<PathRestaurant>,
    ) -> Result<(), StoreError>;

    /// Matchable paths satisfying `query`, ordered by id.
    fn find_paths(&self, query: &PathQuery) -> Result<Vec<Path>, StoreError>;

    /// Distinct start coordinates of every catalogued path, in order of
    /// their first path id.
    fn starting_points(&self) -> Result<Vec<Coord<f64>>, StoreError>;
}

/// Filter over matchable paths used by the runtime matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuery {
    /// Accepted resolved lengths.
    pub band: DistanceBand,
    /// Required start coordinate, compared exactly.
    pub start: Option<Coord<f64>>,
    /// Start coordinates to reject, compared exactly.
    pub exclude_starts: Vec<Coord<f64>>,
    /// Restaurant types that count as stops; every type when empty.
    pub types: Vec<String>,
    /// Minimum number of qualifying restaurants.
    pub min_stops: usize,
    /// Keep only the lowest-id path of each start coordinate.
    pub distinct_starts: bool,
    /// Maximum number of paths returned, counted after `distinct_starts`.
    pub limit: Option<usize>,
}

impl PathQuery {
    /// Query for matchable paths within `band` and no other constraint.
    #[must_use]
    pub const fn within(band: DistanceBand) -> Self {
        Self {
            band,
            start: None,
            exclude_starts: Vec::new(),
            types: Vec::new(),
            min_stops: 0,
            distinct_starts: false,
            limit: None,
        }
    }

    /// Apply the query to `candidates`, given in id order.
    #[must_use]
    pub fn select<I>(&self, candidates: I) -> Vec<Path>
    where
        I: IntoIterator<Item = Path>,
    {
        let mut seen = HashSet::new();
        let matching = candidates
            .into_iter()
            .filter(|path| self.matches(path))
            .filter(|path| !self.distinct_starts || seen.insert(CoordKey::new(path.start)));
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    /// Whether `path` satisfies every constraint of the query.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        if !path.is_matchable() || !self.band.contains(path.resolved_length) {
            return false;
        }
        let start = CoordKey::new(path.start);
        if self
            .start
            .is_some_and(|required| CoordKey::new(required) != start)
        {
            return false;
        }
        if self
            .exclude_starts
            .iter()
            .any(|excluded| CoordKey::new(*excluded) == start)
        {
            return false;
        }
        self.min_stops == 0 || path.qualifying_restaurants(&self.types).count() >= self.min_stops
    }
}
