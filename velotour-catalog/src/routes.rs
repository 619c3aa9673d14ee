//! Recovering the segment sequence of every catalogued path.

use log::{info, warn};
use velotour_core::{
    GraphStore, HopPolicy, PathStore, average_edge_length, find_path_with_length,
};

use crate::PipelineError;
use crate::progress::Progress;

/// Slack, in metres, when matching a walk's length to a path's length.
pub const ROUTE_LENGTH_EPSILON_M: f64 = 1e-6;

/// Outcome of [`resolve_path_routes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteResolutionReport {
    /// Paths whose routes were recorded.
    pub resolved: usize,
    /// Paths left unresolved because no matching walk exists.
    pub unresolved: usize,
}

/// Record the ordered segment ids of every path without routes.
///
/// Each path is re-walked from its start node to its end node with the hop
/// budget the catalogue used, looking for a walk whose length equals the
/// path's resolved length. Paths without such a walk keep `routes` unset
/// and are retried on the next run.
///
/// # Errors
/// Returns [`PipelineError`] when a store operation or graph walk fails.
pub fn resolve_path_routes<P, G>(
    paths: &mut P,
    graph: &G,
    hops: HopPolicy,
    progress_interval: usize,
) -> Result<RouteResolutionReport, PipelineError>
where
    P: PathStore + ?Sized,
    G: GraphStore + ?Sized,
{
    let hops = hops.with_measured_average(
        average_edge_length(graph).map_err(PipelineError::store("measure road graph edges"))?,
    );
    let pending = paths
        .paths_without_routes()
        .map_err(PipelineError::store("read paths without routes"))?;
    let mut report = RouteResolutionReport::default();
    let mut progress = Progress::start("resolve path routes", pending.len(), progress_interval);

    for path in pending {
        progress.tick();
        let (Some(start), Some(end)) = (
            graph
                .find_node(path.start)
                .map_err(PipelineError::store("look up path start"))?,
            graph
                .find_node(path.end)
                .map_err(PipelineError::store("look up path end"))?,
        ) else {
            warn!("path {}: endpoints are not graph nodes; left unresolved", path.id);
            report.unresolved += 1;
            continue;
        };

        let walk = find_path_with_length(
            graph,
            start,
            end,
            path.resolved_length,
            hops.budget(path.target_length),
            ROUTE_LENGTH_EPSILON_M,
        );
        let edges = match walk {
            Ok(Some(edges)) => edges,
            Ok(None) => {
                warn!(
                    "path {}: no walk of {} m from {start} to {end}; left unresolved",
                    path.id, path.resolved_length
                );
                report.unresolved += 1;
                continue;
            }
            Err(source) => {
                return Err(PipelineError::Traversal {
                    node: start,
                    source,
                });
            }
        };

        paths
            .set_routes(path.id, edges.iter().map(|edge| edge.segment_id).collect())
            .map_err(PipelineError::store("record path routes"))?;
        report.resolved += 1;
    }

    progress.finish();
    info!(
        "resolved routes for {} paths, {} left unresolved",
        report.resolved, report.unresolved
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CatalogConfig, TargetDistances, build_catalog, build_road_graph};
    use geo::Coord;
    use rstest::{fixture, rstest};
    use velotour_core::test_support::{grid_point, grid_segments, restaurant};
    use velotour_core::{MemoryStore, NewPath, RoadGraph, SegmentStore};

    struct Fixture {
        store: MemoryStore,
        graph: RoadGraph,
    }

    #[fixture]
    fn catalogued() -> Fixture {
        let mut store = MemoryStore::new(
            grid_segments(4, 4),
            [
                restaurant(1, grid_point(0, 0), "pizzeria"),
                restaurant(2, grid_point(3, 3), "bistro"),
            ],
        );
        let mut graph = RoadGraph::new();
        build_road_graph(&store, &mut graph, 100).expect("build graph");
        let config = CatalogConfig {
            grid_resolution: 2,
            targets: TargetDistances::List(vec![2_224.0, 4_448.0]),
            ..CatalogConfig::default()
        };
        build_catalog(&mut store, &graph, &config).expect("build catalogue");
        Fixture { store, graph }
    }

    #[rstest]
    #[expect(clippy::float_arithmetic, reason = "compares summed segment lengths")]
    fn every_catalogued_path_resolves_to_its_length(mut catalogued: Fixture) {
        let report = resolve_path_routes(
            &mut catalogued.store,
            &catalogued.graph,
            HopPolicy::default(),
            100,
        )
        .expect("resolve routes");
        assert_eq!(report.unresolved, 0);
        assert!(report.resolved > 0);

        for path in catalogued.store.paths() {
            let routes = path.routes.as_ref().expect("routes resolved");
            let segments = catalogued.store.segments_by_id(routes).expect("segments");
            let total: f64 = segments.iter().map(|segment| segment.length).sum();
            assert!((total - path.resolved_length).abs() < 1e-6);
            assert_eq!(segments.first().and_then(|s| s.start()), Some(path.start));
            assert_eq!(segments.last().and_then(|s| s.end()), Some(path.end));
            for pair in segments.windows(2) {
                if let [before, after] = pair {
                    assert_eq!(before.end(), after.start());
                }
            }
        }
    }

    #[rstest]
    fn second_run_has_nothing_to_do(mut catalogued: Fixture) {
        resolve_path_routes(&mut catalogued.store, &catalogued.graph, HopPolicy::default(), 100)
            .expect("first run");
        let report = resolve_path_routes(
            &mut catalogued.store,
            &catalogued.graph,
            HopPolicy::default(),
            100,
        )
        .expect("second run");
        assert_eq!(report, RouteResolutionReport::default());
    }

    #[rstest]
    fn impossible_length_stays_unresolved() {
        let mut store = MemoryStore::new(grid_segments(2, 1), Vec::new());
        let mut graph = RoadGraph::new();
        build_road_graph(&store, &mut graph, 100).expect("build graph");
        let ids = store
            .insert_paths(&[NewPath {
                start: grid_point(0, 0),
                end: grid_point(1, 0),
                target_length: 5_000.0,
                resolved_length: 4_999.0,
            }])
            .expect("insert");
        let report = resolve_path_routes(&mut store, &graph, HopPolicy::default(), 100)
            .expect("resolve");
        assert_eq!(report.unresolved, 1);
        let pending = store.paths_without_routes().expect("pending");
        assert_eq!(pending.iter().map(|p| p.id).collect::<Vec<_>>(), ids);
    }

    #[rstest]
    fn path_off_the_graph_stays_unresolved() {
        let mut store = MemoryStore::new(grid_segments(2, 1), Vec::new());
        let mut graph = RoadGraph::new();
        build_road_graph(&store, &mut graph, 100).expect("build graph");
        store
            .insert_paths(&[NewPath {
                start: Coord { x: 9.0, y: 9.0 },
                end: grid_point(1, 0),
                target_length: 1_000.0,
                resolved_length: 1_000.0,
            }])
            .expect("insert");
        let report = resolve_path_routes(&mut store, &graph, HopPolicy::default(), 100)
            .expect("resolve");
        assert_eq!(report.unresolved, 1);
    }
}
