//! In-memory implementation of every store trait.

use std::collections::{BTreeMap, HashSet};

use geo::{Coord, Rect};

use super::{PathQuery, PathStore, PointIndex, RestaurantStore, SegmentStore, StoreError};
use crate::geometry::{CoordKey, bounding_box};
use crate::{NewPath, Path, PathRestaurant, Restaurant, RouteSegment};

/// Store holding segments, restaurants and paths in ordered maps.
///
/// Spatial queries go through R\*-tree indices rebuilt whenever segments or
/// restaurants are replaced.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    segments: BTreeMap<u64, RouteSegment>,
    restaurants: BTreeMap<u64, Restaurant>,
    paths: BTreeMap<u64, Path>,
    restaurant_index: PointIndex,
    segment_start_index: PointIndex,
    next_path_id: u64,
}

impl MemoryStore {
    /// Create a store from segments and restaurants.
    pub fn new<S, R>(segments: S, restaurants: R) -> Self
    where
        S: IntoIterator<Item = RouteSegment>,
        R: IntoIterator<Item = Restaurant>,
    {
        let mut store = Self {
            next_path_id: 1,
            ..Self::default()
        };
        store.replace_segments(segments);
        store.replace_restaurants(restaurants);
        store
    }

    /// Replace every segment, keyed by id.
    pub fn replace_segments<S>(&mut self, segments: S)
    where
        S: IntoIterator<Item = RouteSegment>,
    {
        self.segments = segments
            .into_iter()
            .map(|segment| (segment.id, segment))
            .collect();
        self.segment_start_index = PointIndex::new(
            self.segments
                .values()
                .filter_map(|segment| segment.start().map(|start| (segment.id, start))),
        );
    }

    /// Replace every restaurant, keyed by id.
    pub fn replace_restaurants<R>(&mut self, restaurants: R)
    where
        R: IntoIterator<Item = Restaurant>,
    {
        self.restaurants = restaurants
            .into_iter()
            .map(|restaurant| (restaurant.id, restaurant))
            .collect();
        self.restaurant_index = PointIndex::new(
            self.restaurants
                .values()
                .map(|restaurant| (restaurant.id, restaurant.location)),
        );
    }

    /// Every stored path regardless of resolution state, ordered by id.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    /// Insert a fully formed path, keeping its identifier.
    pub fn insert_path(&mut self, path: Path) {
        self.next_path_id = self.next_path_id.max(path.id + 1);
        self.paths.insert(path.id, path);
    }

    fn path_mut(&mut self, id: u64) -> Result<&mut Path, StoreError> {
        self.paths
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "path", id })
    }
}

impl SegmentStore for MemoryStore {
    fn segments(&self) -> Result<Vec<RouteSegment>, StoreError> {
        Ok(self.segments.values().cloned().collect())
    }

    fn segments_by_id(&self, ids: &[u64]) -> Result<Vec<RouteSegment>, StoreError> {
        ids.iter()
            .map(|id| {
                self.segments.get(id).cloned().ok_or(StoreError::NotFound {
                    entity: "segment",
                    id: *id,
                })
            })
            .collect()
    }

    fn set_linked_restaurants(
        &mut self,
        id: u64,
        restaurants: Vec<u64>,
    ) -> Result<(), StoreError> {
        let segment = self.segments.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "segment",
            id,
        })?;
        segment.linked_restaurants = restaurants;
        Ok(())
    }

    fn nearest_segment_start(&self, point: Coord<f64>) -> Result<Option<Coord<f64>>, StoreError> {
        Ok(self
            .segment_start_index
            .nearest(point)
            .map(|(_, start)| start))
    }
}

impl RestaurantStore for MemoryStore {
    fn restaurants(&self) -> Result<Vec<Restaurant>, StoreError> {
        Ok(self.restaurants.values().cloned().collect())
    }

    fn restaurants_by_id(&self, ids: &[u64]) -> Result<Vec<Restaurant>, StoreError> {
        let mut found: Vec<Restaurant> = ids
            .iter()
            .filter_map(|id| self.restaurants.get(id).cloned())
            .collect();
        found.sort_by_key(|restaurant| restaurant.id);
        found.dedup_by_key(|restaurant| restaurant.id);
        Ok(found)
    }

    fn restaurants_within(
        &self,
        centre: Coord<f64>,
        radius_m: f64,
    ) -> Result<Vec<u64>, StoreError> {
        Ok(self.restaurant_index.within_radius(centre, radius_m))
    }

    fn restaurant_bounds(&self) -> Result<Option<Rect<f64>>, StoreError> {
        Ok(bounding_box(
            self.restaurants.values().map(|restaurant| restaurant.location),
        ))
    }
}

impl PathStore for MemoryStore {
    fn path_count(&self) -> Result<usize, StoreError> {
        Ok(self.paths.len())
    }

    fn clear_paths(&mut self) -> Result<(), StoreError> {
        self.paths.clear();
        Ok(())
    }

    fn insert_paths(&mut self, paths: &[NewPath]) -> Result<Vec<u64>, StoreError> {
        let mut ids = Vec::with_capacity(paths.len());
        for new in paths {
            let id = self.next_path_id.max(1);
            self.next_path_id = id + 1;
            self.paths.insert(id, Path::from_new(id, *new));
            ids.push(id);
        }
        Ok(ids)
    }

    fn paths_without_routes(&self) -> Result<Vec<Path>, StoreError> {
        Ok(self
            .paths
            .values()
            .filter(|path| path.routes.is_none())
            .cloned()
            .collect())
    }

    fn set_routes(&mut self, id: u64, routes: Vec<u64>) -> Result<(), StoreError> {
        self.path_mut(id)?.routes = Some(routes);
        Ok(())
    }

    fn paths_without_restaurants(&self) -> Result<Vec<Path>, StoreError> {
        Ok(self
            .paths
            .values()
            .filter(|path| path.routes.is_some() && path.restaurants.is_none())
            .cloned()
            .collect())
    }

    fn set_restaurants(
        &mut self,
        id: u64,
        restaurants: Vec<PathRestaurant>,
    ) -> Result<(), StoreError> {
        self.path_mut(id)?.restaurants = Some(restaurants);
        Ok(())
    }

    fn find_paths(&self, query: &PathQuery) -> Result<Vec<Path>, StoreError> {
        Ok(query.select(self.paths.values().cloned()))
    }

    fn starting_points(&self) -> Result<Vec<Coord<f64>>, StoreError> {
        let mut seen = HashSet::new();
        Ok(self
            .paths
            .values()
            .map(|path| path.start)
            .filter(|start| seen.insert(CoordKey::new(*start)))
            .collect())
    }
}
