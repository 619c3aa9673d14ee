use geo::{Coord, LineString};

use crate::geometry::polyline_length;

/// A directed cycling road segment.
///
/// The geometry runs from its first to its last vertex; the road graph adds
/// exactly one edge per segment in that direction. `length` is expressed in
/// metres and `linked_restaurants` lists the ids of restaurants within the
/// linking radius of the geometry, sorted ascending once linked.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteSegment {
    pub id: u64,
    pub geometry: LineString<f64>,
    pub length: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub linked_restaurants: Vec<u64>,
}

impl RouteSegment {
    /// Construct an unlinked segment with an explicit length.
    pub const fn new(id: u64, geometry: LineString<f64>, length: f64) -> Self {
        Self {
            id,
            geometry,
            length,
            linked_restaurants: Vec::new(),
        }
    }

    /// Construct an unlinked segment whose length is measured from its geometry.
    ///
    /// # Examples
    /// ```
    /// use geo::LineString;
    /// use velotour_core::RouteSegment;
    ///
    /// let segment = RouteSegment::measured(7, LineString::from(vec![(0.0, 0.0), (0.0, 0.01)]));
    /// assert!((segment.length - 1_111.95).abs() < 1.0);
    /// ```
    #[must_use]
    pub fn measured(id: u64, geometry: LineString<f64>) -> Self {
        let length = polyline_length(&geometry);
        Self::new(id, geometry, length)
    }

    /// First vertex of the geometry.
    #[must_use]
    pub fn start(&self) -> Option<Coord<f64>> {
        self.geometry.0.first().copied()
    }

    /// Last vertex of the geometry.
    #[must_use]
    pub fn end(&self) -> Option<Coord<f64>> {
        self.geometry.0.last().copied()
    }
}
