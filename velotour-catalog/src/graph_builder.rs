//! Road graph construction from route segments.

use log::{info, warn};
use velotour_core::{Edge, GraphStore, NodeId, RouteSegment, SegmentStore};

use crate::PipelineError;
use crate::progress::Progress;

/// Outcome of [`build_road_graph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphBuildReport {
    /// Segments read from the store.
    pub segments_seen: usize,
    /// Segments that contributed no edge: degenerate geometry, closed loops
    /// or non-positive lengths.
    pub skipped_segments: usize,
    /// Nodes created by this run.
    pub nodes_created: usize,
    /// Edges created by this run.
    pub edges_created: usize,
}

/// Add one node per distinct segment endpoint and one edge per segment.
///
/// Nodes and edges that already exist are left untouched, so running the
/// builder twice over the same segments changes nothing the second time.
///
/// # Errors
/// Returns [`PipelineError::Store`] when a store read or write fails. The
/// build stops at the first failure.
pub fn build_road_graph<S, G>(
    segments: &S,
    graph: &mut G,
    progress_interval: usize,
) -> Result<GraphBuildReport, PipelineError>
where
    S: SegmentStore + ?Sized,
    G: GraphStore + ?Sized,
{
    let segments = segments
        .segments()
        .map_err(PipelineError::store("read route segments"))?;
    let mut report = GraphBuildReport {
        segments_seen: segments.len(),
        ..GraphBuildReport::default()
    };
    let mut progress = Progress::start("build road graph", segments.len(), progress_interval);

    for segment in &segments {
        progress.tick();
        let Some((start, end)) = endpoints(segment) else {
            report.skipped_segments += 1;
            continue;
        };
        let (source, created_source) = node_for(graph, start)?;
        let (target, created_target) = node_for(graph, end)?;
        report.nodes_created += usize::from(created_source) + usize::from(created_target);

        if source == target {
            report.skipped_segments += 1;
            continue;
        }
        if graph
            .has_edge(source, target)
            .map_err(PipelineError::store("look up edge"))?
        {
            continue;
        }
        graph
            .insert_edge(Edge {
                source,
                target,
                distance: segment.length,
                segment_id: segment.id,
            })
            .map_err(PipelineError::store("insert edge"))?;
        report.edges_created += 1;
    }

    progress.finish();
    info!(
        "road graph: {} segments, {} skipped, {} nodes and {} edges created",
        report.segments_seen, report.skipped_segments, report.nodes_created, report.edges_created
    );
    Ok(report)
}

fn endpoints(segment: &RouteSegment) -> Option<(geo::Coord<f64>, geo::Coord<f64>)> {
    if segment.geometry.0.len() < 2 {
        warn!("segment {} has fewer than two vertices; skipped", segment.id);
        return None;
    }
    if !(segment.length.is_finite() && segment.length > 0.0) {
        warn!(
            "segment {} has non-positive length {}; skipped",
            segment.id, segment.length
        );
        return None;
    }
    Some((segment.start()?, segment.end()?))
}

fn node_for<G>(graph: &mut G, location: geo::Coord<f64>) -> Result<(NodeId, bool), PipelineError>
where
    G: GraphStore + ?Sized,
{
    if let Some(existing) = graph
        .find_node(location)
        .map_err(PipelineError::store("look up node"))?
    {
        return Ok((existing, false));
    }
    let created = graph
        .insert_node(location)
        .map_err(PipelineError::store("insert node"))?;
    Ok((created, true))
}
