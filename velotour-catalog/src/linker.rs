//! Linking restaurants to the segments they are close to.

use std::collections::BTreeSet;

use log::info;
use velotour_core::{RestaurantStore, SegmentStore};

use crate::progress::Progress;
use crate::{LinkerConfig, PipelineError};

/// Outcome of [`link_restaurants`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Segments whose linked restaurants were rewritten.
    pub segments_linked: usize,
    /// Total number of segment–restaurant links written.
    pub links_written: usize,
}

/// Record, for every segment, the restaurants within `config.radius_m`
/// metres of either endpoint.
///
/// The union of both endpoint neighbourhoods is stored sorted by id,
/// replacing whatever was linked before, so the stage can be rerun safely.
/// Segments with empty geometry are linked to nothing.
///
/// # Errors
/// Returns [`PipelineError::InvalidRadius`] for a non-positive radius and
/// [`PipelineError::Store`] when a store operation fails.
pub fn link_restaurants<S>(store: &mut S, config: &LinkerConfig) -> Result<LinkReport, PipelineError>
where
    S: SegmentStore + RestaurantStore + ?Sized,
{
    if !(config.radius_m.is_finite() && config.radius_m > 0.0) {
        return Err(PipelineError::InvalidRadius {
            radius_m: config.radius_m,
        });
    }
    let segments = store
        .segments()
        .map_err(PipelineError::store("read route segments"))?;
    let mut report = LinkReport::default();
    let mut progress = Progress::start(
        "link restaurants",
        segments.len(),
        config.progress_interval,
    );

    for segment in segments {
        progress.tick();
        let mut linked = BTreeSet::new();
        for endpoint in [segment.start(), segment.end()].into_iter().flatten() {
            linked.extend(
                store
                    .restaurants_within(endpoint, config.radius_m)
                    .map_err(PipelineError::store("query restaurants near segment"))?,
            );
        }
        report.links_written += linked.len();
        store
            .set_linked_restaurants(segment.id, linked.into_iter().collect())
            .map_err(PipelineError::store("write linked restaurants"))?;
        report.segments_linked += 1;
    }

    progress.finish();
    info!(
        "linked {} restaurants across {} segments",
        report.links_written, report.segments_linked
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString};
    use rstest::{fixture, rstest};
    use velotour_core::test_support::restaurant;
    use velotour_core::{MemoryStore, RouteSegment};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    /// One 2.2 km segment running east along the equator.
    #[fixture]
    fn store() -> MemoryStore {
        MemoryStore::new(
            [RouteSegment::measured(
                1,
                LineString::from(vec![(0.0, 0.0), (0.01, 0.0), (0.02, 0.0)]),
            )],
            [
                // ~110 m from the start.
                restaurant(3, c(0.0, 0.001), "pizzeria"),
                // ~110 m from the end.
                restaurant(1, c(0.02, 0.001), "bistro"),
                // On the midpoint, ~1.1 km from either endpoint.
                restaurant(2, c(0.01, 0.0), "creperie"),
                // Far from the segment.
                restaurant(4, c(1.0, 1.0), "sushi"),
            ],
        )
    }

    fn linked(store: &MemoryStore) -> Vec<u64> {
        store
            .segments()
            .expect("segments")
            .first()
            .map(|segment| segment.linked_restaurants.clone())
            .unwrap_or_default()
    }

    #[rstest]
    fn links_restaurants_near_either_endpoint(mut store: MemoryStore) {
        let report = link_restaurants(&mut store, &LinkerConfig::default()).expect("link");
        assert_eq!(linked(&store), vec![1, 3]);
        assert_eq!(
            report,
            LinkReport {
                segments_linked: 1,
                links_written: 2
            }
        );
    }

    #[rstest]
    fn wider_radius_reaches_midpoint(mut store: MemoryStore) {
        let config = LinkerConfig {
            radius_m: 1_200.0,
            ..LinkerConfig::default()
        };
        link_restaurants(&mut store, &config).expect("link");
        assert_eq!(linked(&store), vec![1, 2, 3]);
    }

    #[rstest]
    fn relinking_overwrites_previous_links(mut store: MemoryStore) {
        let wide = LinkerConfig {
            radius_m: 1_200.0,
            ..LinkerConfig::default()
        };
        link_restaurants(&mut store, &wide).expect("first link");
        link_restaurants(&mut store, &LinkerConfig::default()).expect("second link");
        assert_eq!(linked(&store), vec![1, 3]);
    }

    #[rstest]
    fn shared_restaurants_are_not_duplicated() {
        let mut store = MemoryStore::new(
            [RouteSegment::measured(
                1,
                LineString::from(vec![(0.0, 0.0), (0.001, 0.0)]),
            )],
            [restaurant(9, c(0.0005, 0.0), "bistro")],
        );
        link_restaurants(&mut store, &LinkerConfig::default()).expect("link");
        assert_eq!(linked(&store), vec![9]);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-10.0)]
    #[case(f64::INFINITY)]
    fn invalid_radius_is_rejected(mut store: MemoryStore, #[case] radius_m: f64) {
        let config = LinkerConfig {
            radius_m,
            ..LinkerConfig::default()
        };
        let result = link_restaurants(&mut store, &config);
        assert!(matches!(result, Err(PipelineError::InvalidRadius { .. })));
    }
}
