//! Attaching restaurants to paths with resolved routes.

use std::collections::{HashMap, HashSet};

use log::{info, warn};
use velotour_core::{PathRestaurant, PathStore, RestaurantStore, SegmentStore};

use crate::PipelineError;
use crate::progress::Progress;

/// Outcome of [`resolve_path_restaurants`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestaurantResolutionReport {
    /// Paths whose restaurant list was recorded.
    pub resolved: usize,
    /// Linked restaurant ids that no longer exist and were left out.
    pub dropped_ids: usize,
}

/// Record the restaurants reachable along every path whose routes are known.
///
/// The linked restaurants of the route's segments are concatenated in route
/// order and deduplicated by id, keeping the first occurrence.
///
/// # Errors
/// Returns [`PipelineError::Store`] when a store read or write fails.
pub fn resolve_path_restaurants<S>(
    store: &mut S,
    progress_interval: usize,
) -> Result<RestaurantResolutionReport, PipelineError>
where
    S: PathStore + SegmentStore + RestaurantStore + ?Sized,
{
    let pending = store
        .paths_without_restaurants()
        .map_err(PipelineError::store("read paths without restaurants"))?;
    let mut report = RestaurantResolutionReport::default();
    let mut progress = Progress::start(
        "resolve path restaurants",
        pending.len(),
        progress_interval,
    );

    for path in pending {
        progress.tick();
        let routes = path.routes.unwrap_or_default();
        let segments = store
            .segments_by_id(&routes)
            .map_err(PipelineError::store("read path segments"))?;

        let mut seen = HashSet::new();
        let ordered: Vec<u64> = segments
            .iter()
            .flat_map(|segment| segment.linked_restaurants.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect();
        let kinds: HashMap<u64, String> = store
            .restaurants_by_id(&ordered)
            .map_err(PipelineError::store("read path restaurants"))?
            .into_iter()
            .map(|restaurant| (restaurant.id, restaurant.kind))
            .collect();

        let mut restaurants = Vec::with_capacity(ordered.len());
        for id in ordered {
            if let Some(kind) = kinds.get(&id) {
                restaurants.push(PathRestaurant::new(id, kind.as_str()));
            } else {
                warn!("path {}: linked restaurant {id} no longer exists", path.id);
                report.dropped_ids += 1;
            }
        }

        store
            .set_restaurants(path.id, restaurants)
            .map_err(PipelineError::store("record path restaurants"))?;
        report.resolved += 1;
    }

    progress.finish();
    info!(
        "resolved restaurants for {} paths, {} stale links dropped",
        report.resolved, report.dropped_ids
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;
    use rstest::{fixture, rstest};
    use velotour_core::test_support::{grid_point, restaurant};
    use velotour_core::{MemoryStore, NewPath, RouteSegment};

    fn segment(id: u64, from: (u32, u32), to: (u32, u32), linked: Vec<u64>) -> RouteSegment {
        let mut segment = RouteSegment::measured(
            id,
            LineString::from(vec![grid_point(from.0, from.1), grid_point(to.0, to.1)]),
        );
        segment.linked_restaurants = linked;
        segment
    }

    /// Three chained segments sharing restaurant 2, with a path over them.
    #[fixture]
    fn store() -> MemoryStore {
        let mut store = MemoryStore::new(
            [
                segment(1, (0, 0), (1, 0), vec![3, 2]),
                segment(2, (1, 0), (2, 0), vec![2, 1]),
                segment(3, (2, 0), (3, 0), vec![1, 9]),
            ],
            [
                restaurant(1, grid_point(2, 0), "bistro"),
                restaurant(2, grid_point(1, 0), "pizzeria"),
                restaurant(3, grid_point(0, 0), "pizzeria"),
            ],
        );
        let ids = store
            .insert_paths(&[NewPath {
                start: grid_point(0, 0),
                end: grid_point(3, 0),
                target_length: 3_300.0,
                resolved_length: 3_336.0,
            }])
            .expect("insert path");
        for id in ids {
            store.set_routes(id, vec![1, 2, 3]).expect("set routes");
        }
        store
    }

    fn restaurants(store: &MemoryStore) -> Vec<PathRestaurant> {
        store
            .paths()
            .next()
            .and_then(|path| path.restaurants.clone())
            .unwrap_or_default()
    }

    #[rstest]
    fn keeps_route_order_without_duplicates(mut store: MemoryStore) {
        let report = resolve_path_restaurants(&mut store, 100).expect("resolve");
        assert_eq!(report.resolved, 1);
        assert_eq!(
            restaurants(&store),
            vec![
                PathRestaurant::new(3, "pizzeria"),
                PathRestaurant::new(2, "pizzeria"),
                PathRestaurant::new(1, "bistro"),
            ]
        );
    }

    #[rstest]
    fn stale_links_are_dropped(mut store: MemoryStore) {
        let report = resolve_path_restaurants(&mut store, 100).expect("resolve");
        assert_eq!(report.dropped_ids, 1);
        assert!(restaurants(&store).iter().all(|r| r.id != 9));
    }

    #[rstest]
    fn resolved_paths_become_matchable(mut store: MemoryStore) {
        resolve_path_restaurants(&mut store, 100).expect("resolve");
        assert!(store.paths().all(velotour_core::Path::is_matchable));
        let second = resolve_path_restaurants(&mut store, 100).expect("second run");
        assert_eq!(second, RestaurantResolutionReport::default());
    }

    #[rstest]
    fn paths_without_routes_are_not_touched() {
        let mut store = MemoryStore::new(Vec::new(), Vec::new());
        store
            .insert_paths(&[NewPath {
                start: grid_point(0, 0),
                end: grid_point(1, 0),
                target_length: 1_000.0,
                resolved_length: 1_112.0,
            }])
            .expect("insert path");
        let report = resolve_path_restaurants(&mut store, 100).expect("resolve");
        assert_eq!(report.resolved, 0);
        assert!(store.paths().all(|path| path.restaurants.is_none()));
    }
}
