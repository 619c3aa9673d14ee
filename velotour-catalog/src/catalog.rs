//! Offline discovery of candidate paths.
//!
//! Starting points are sampled on a grid laid over the restaurants, snapped
//! to the nearest segment start. From each starting point the road graph is
//! walked once per target distance and every node reached within the
//! tolerance band becomes the end of a new catalogue entry.

use std::collections::HashSet;

use geo::Coord;
use log::{debug, info, warn};
use velotour_core::geometry::grid_cell_centres;
use velotour_core::{
    CoordKey, DistanceBand, GraphStore, NewPath, PathStore, RestaurantStore, SegmentStore,
    StoreError, average_edge_length, nodes_within_band,
};

use crate::progress::Progress;
use crate::{CatalogConfig, PipelineError};

/// Outcome of [`build_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogReport {
    /// Starting points walked from.
    pub starting_points: usize,
    /// Sampled starting points that were not graph nodes.
    pub skipped_starting_points: usize,
    /// Target distances walked per starting point.
    pub bands: usize,
    /// Paths written to the catalogue.
    pub paths_inserted: usize,
    /// The catalogue already held paths and was left untouched.
    pub already_built: bool,
}

/// Starting points for the catalogue.
///
/// The restaurant bounding box is cut into `resolution` × `resolution`
/// cells; each cell contributes the start vertex of the segment whose start
/// lies closest to the cell centre. Sparse cells may snap to the same vertex,
/// so the result can contain duplicates.
///
/// # Errors
/// Returns [`PipelineError::NoRestaurants`] when the store holds no
/// restaurants and [`PipelineError::Store`] when a query fails.
pub fn sample_starting_points<S>(store: &S, resolution: u32) -> Result<Vec<Coord<f64>>, PipelineError>
where
    S: SegmentStore + RestaurantStore + ?Sized,
{
    let bounds = store
        .restaurant_bounds()
        .map_err(PipelineError::store("compute restaurant bounds"))?
        .ok_or(PipelineError::NoRestaurants)?;
    let mut starts = Vec::new();
    for centre in grid_cell_centres(bounds, resolution) {
        if let Some(start) = store
            .nearest_segment_start(centre)
            .map_err(PipelineError::store("find nearest segment start"))?
        {
            starts.push(start);
        }
    }
    info!("sampled {} starting points", starts.len());
    Ok(starts)
}

/// Populate the path catalogue.
///
/// A catalogue that already holds paths is left untouched unless
/// `config.rebuild` is set, in which case it is emptied first. New paths
/// have unresolved routes and restaurants.
///
/// # Errors
/// Returns [`PipelineError`] when a target has no valid band, when sampling
/// fails, or when a graph walk or store write fails.
pub fn build_catalog<S, G>(
    store: &mut S,
    graph: &G,
    config: &CatalogConfig,
) -> Result<CatalogReport, PipelineError>
where
    S: SegmentStore + RestaurantStore + PathStore + ?Sized,
    G: GraphStore + ?Sized,
{
    let existing = store
        .path_count()
        .map_err(PipelineError::store("count catalogued paths"))?;
    if existing > 0 {
        if !config.rebuild {
            info!("catalogue already holds {existing} paths; nothing to do");
            return Ok(CatalogReport {
                already_built: true,
                ..CatalogReport::default()
            });
        }
        info!("dropping {existing} catalogued paths before rebuilding");
        store
            .clear_paths()
            .map_err(PipelineError::store("clear catalogued paths"))?;
    }

    let bands = target_bands(config)?;
    let hops = config.hops.with_measured_average(
        average_edge_length(graph).map_err(PipelineError::store("measure road graph edges"))?,
    );
    let mut starts = sample_starting_points(store, config.grid_resolution)?;
    if config.dedupe_starting_points {
        let mut seen = HashSet::new();
        starts.retain(|start| seen.insert(CoordKey::new(*start)));
    }

    let mut report = CatalogReport {
        bands: bands.len(),
        ..CatalogReport::default()
    };
    let mut progress = Progress::start("build catalogue", starts.len(), config.progress_interval);
    for start in starts {
        progress.tick();
        let Some(node) = graph
            .find_node(start)
            .map_err(PipelineError::store("look up starting node"))?
        else {
            warn!("starting point ({}, {}) is not a graph node; skipped", start.x, start.y);
            report.skipped_starting_points += 1;
            continue;
        };

        let mut batch = Vec::new();
        for (target, band) in &bands {
            let max_hops = hops.budget(*target);
            let hits = nodes_within_band(graph, node, *band, max_hops)
                .map_err(|source| PipelineError::Traversal { node, source })?;
            debug!(
                "{node}: {} paths for {target} m within {max_hops} hops",
                hits.len()
            );
            for hit in hits {
                let end = graph
                    .node_location(hit.node)
                    .map_err(PipelineError::store("read end node"))?
                    .ok_or(PipelineError::Store {
                        operation: "read end node",
                        source: StoreError::NotFound {
                            entity: "node",
                            id: hit.node.0,
                        },
                    })?;
                batch.push(NewPath {
                    start,
                    end,
                    target_length: *target,
                    resolved_length: hit.distance,
                });
            }
        }
        report.starting_points += 1;
        report.paths_inserted += batch.len();
        store
            .insert_paths(&batch)
            .map_err(PipelineError::store("insert catalogued paths"))?;
    }

    progress.finish();
    info!(
        "catalogued {} paths from {} starting points over {} target distances",
        report.paths_inserted, report.starting_points, report.bands
    );
    Ok(report)
}

fn target_bands(config: &CatalogConfig) -> Result<Vec<(f64, DistanceBand)>, PipelineError> {
    config
        .targets
        .resolve()?
        .into_iter()
        .map(|target| {
            config
                .tolerance
                .band(target)
                .map(|band| (target, band))
                .map_err(|source| PipelineError::InvalidTarget { target, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TargetDistances, build_road_graph};
    use rstest::{fixture, rstest};
    use velotour_core::test_support::{grid_point, grid_segments, restaurant};
    use velotour_core::{MatchTolerance, MemoryStore, RoadGraph};

    struct Fixture {
        store: MemoryStore,
        graph: RoadGraph,
    }

    /// A 4 × 4 grid with restaurants on two opposite corners.
    #[fixture]
    fn city() -> Fixture {
        let store = MemoryStore::new(
            grid_segments(4, 4),
            [
                restaurant(1, grid_point(0, 0), "pizzeria"),
                restaurant(2, grid_point(3, 3), "bistro"),
            ],
        );
        let mut graph = RoadGraph::new();
        build_road_graph(&store, &mut graph, 100).expect("build graph");
        Fixture { store, graph }
    }

    fn config(targets: Vec<f64>) -> CatalogConfig {
        CatalogConfig {
            grid_resolution: 2,
            targets: TargetDistances::List(targets),
            ..CatalogConfig::default()
        }
    }

    #[rstest]
    fn sampled_points_are_segment_starts(city: Fixture) {
        let starts = sample_starting_points(&city.store, 2).expect("sample");
        assert_eq!(starts.len(), 4);
        for start in starts {
            assert!(city.graph.find_node(start).expect("lookup").is_some());
        }
    }

    #[rstest]
    fn sampling_without_restaurants_fails() {
        let store = MemoryStore::new(grid_segments(2, 2), Vec::new());
        let result = sample_starting_points(&store, 2);
        assert!(matches!(result, Err(PipelineError::NoRestaurants)));
    }

    #[rstest]
    #[expect(clippy::float_arithmetic, reason = "checks tolerance band bounds")]
    fn catalogued_lengths_lie_within_tolerance(mut city: Fixture) {
        let report =
            build_catalog(&mut city.store, &city.graph, &config(vec![2_224.0, 3_336.0]))
                .expect("build catalogue");
        assert!(report.paths_inserted > 0);
        assert_eq!(report.bands, 2);
        for path in city.store.paths() {
            let slack = path.target_length * MatchTolerance::default().ratio;
            assert!((path.resolved_length - path.target_length).abs() <= slack);
            assert!(path.routes.is_none());
            assert!(path.restaurants.is_none());
        }
    }

    #[rstest]
    fn existing_catalogue_is_left_alone(mut city: Fixture) {
        let first = build_catalog(&mut city.store, &city.graph, &config(vec![2_224.0]))
            .expect("first build");
        let second = build_catalog(&mut city.store, &city.graph, &config(vec![2_224.0]))
            .expect("second build");
        assert!(second.already_built);
        assert_eq!(
            city.store.path_count().expect("count"),
            first.paths_inserted
        );
    }

    #[rstest]
    fn rebuild_replaces_catalogue(mut city: Fixture) {
        build_catalog(&mut city.store, &city.graph, &config(vec![2_224.0, 3_336.0]))
            .expect("first build");
        let rebuild = CatalogConfig {
            rebuild: true,
            ..config(vec![2_224.0])
        };
        let report =
            build_catalog(&mut city.store, &city.graph, &rebuild).expect("rebuild");
        assert_eq!(city.store.path_count().expect("count"), report.paths_inserted);
        assert!(city.store.paths().all(|path| path.target_length == 2_224.0));
    }

    #[rstest]
    fn dedupe_collapses_shared_starting_points(mut city: Fixture) {
        let dense = CatalogConfig {
            grid_resolution: 8,
            dedupe_starting_points: true,
            ..config(vec![2_224.0])
        };
        let report = build_catalog(&mut city.store, &city.graph, &dense).expect("build");
        assert!(report.starting_points <= 16);
    }

    #[rstest]
    fn invalid_target_is_reported(mut city: Fixture) {
        let result = build_catalog(&mut city.store, &city.graph, &config(vec![-5.0]));
        assert!(matches!(
            result,
            Err(PipelineError::InvalidTarget { .. })
        ));
    }

    #[rstest]
    fn starts_missing_from_graph_are_skipped(mut city: Fixture) {
        let empty_graph = RoadGraph::new();
        let report =
            build_catalog(&mut city.store, &empty_graph, &config(vec![2_224.0])).expect("build");
        assert_eq!(report.starting_points, 0);
        assert_eq!(report.skipped_starting_points, 4);
        assert_eq!(report.paths_inserted, 0);
    }
}
