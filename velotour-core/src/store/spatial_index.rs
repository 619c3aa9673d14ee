//! R\*-tree index over identified points.
//!
//! Restaurants are indexed by location and route segments by their start
//! vertex. The tree works in degree space; radius queries refine the
//! envelope candidates with great-circle distances.

use geo::Coord;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::geometry::{haversine_distance, radius_envelope};

#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    id: u64,
    location: Coord<f64>,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.x, self.location.y])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.location.x - point[0];
        let dy = self.location.y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index of `(id, coordinate)` pairs.
#[derive(Debug, Clone, Default)]
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    /// Bulk-load an index from `(id, location)` pairs.
    pub fn new<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (u64, Coord<f64>)>,
    {
        let entries = points
            .into_iter()
            .map(|(id, location)| IndexedPoint { id, location })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Ids of points within `radius_m` metres of `centre`, ascending.
    #[must_use]
    pub fn within_radius(&self, centre: Coord<f64>, radius_m: f64) -> Vec<u64> {
        let bbox = radius_envelope(centre, radius_m);
        let envelope =
            AABB::from_corners([bbox.min().x, bbox.min().y], [bbox.max().x, bbox.max().y]);
        let mut ids: Vec<u64> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|point| haversine_distance(centre, point.location) <= radius_m)
            .map(|point| point.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Point closest to `target` in degree space.
    #[must_use]
    pub fn nearest(&self, target: Coord<f64>) -> Option<(u64, Coord<f64>)> {
        self.tree
            .nearest_neighbor(&[target.x, target.y])
            .map(|point| (point.id, point.location))
    }
}
