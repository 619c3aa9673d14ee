//! Geodesic helpers shared by the catalog pipeline and the runtime matcher.
//!
//! Coordinates follow the GeoJSON convention: `x` is longitude and `y` is
//! latitude, both in WGS84 degrees. Distances are great-circle metres.

use geo::{Coord, LineString, Rect};

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Relative slack added to envelope half-widths to absorb rounding.
const ENVELOPE_MARGIN: f64 = 1.001;

/// Great-circle distance between two coordinates, in metres.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use velotour_core::haversine_distance;
///
/// let paris = Coord { x: 2.3522, y: 48.8566 };
/// assert_eq!(haversine_distance(paris, paris), 0.0);
/// ```
#[must_use]
pub fn haversine_distance(from: Coord<f64>, to: Coord<f64>) -> f64 {
    let lat1 = from.y.to_radians();
    let lat2 = to.y.to_radians();
    let dlat = (to.y - from.y).to_radians();
    let dlon = (to.x - from.x).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Sum of the great-circle lengths of every segment of `line`, in metres.
#[must_use]
pub fn polyline_length(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| haversine_distance(segment.start, segment.end))
        .sum()
}

/// Degree-space rectangle enclosing a circle of `radius_m` around `centre`.
///
/// The rectangle is a conservative prefilter for spatial indices; callers
/// refine candidates with [`haversine_distance`]. Half-widths follow the
/// same sphere as [`haversine_distance`], so no point within `radius_m`
/// falls outside.
#[must_use]
pub fn radius_envelope(centre: Coord<f64>, radius_m: f64) -> Rect<f64> {
    let angular = (radius_m / EARTH_RADIUS_M) * ENVELOPE_MARGIN;
    let dlat = angular.to_degrees();
    // Widest longitude reached on a spherical cap; a cap covering a pole
    // spans every meridian.
    let cos_lat = centre.y.to_radians().cos().abs();
    let ratio = angular.min(std::f64::consts::FRAC_PI_2).sin() / cos_lat;
    let dlon = if ratio < 1.0 {
        ratio.asin().to_degrees()
    } else {
        180.0
    };
    Rect::new(
        Coord {
            x: centre.x - dlon,
            y: centre.y - dlat,
        },
        Coord {
            x: centre.x + dlon,
            y: centre.y + dlat,
        },
    )
}

/// Axis-aligned bounding box of `coords`, or `None` when empty.
#[must_use]
pub fn bounding_box<I>(coords: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = Coord<f64>>,
{
    let mut iter = coords.into_iter();
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(min, max), c| {
        (
            Coord {
                x: min.x.min(c.x),
                y: min.y.min(c.y),
            },
            Coord {
                x: max.x.max(c.x),
                y: max.y.max(c.y),
            },
        )
    });
    Some(Rect::new(min, max))
}

/// Centres of a `resolution` × `resolution` grid laid over `bbox`.
///
/// Cells are emitted row by row from the south-west corner. A zero
/// resolution yields no cells.
#[must_use]
pub fn grid_cell_centres(bbox: Rect<f64>, resolution: u32) -> Vec<Coord<f64>> {
    if resolution == 0 {
        return Vec::new();
    }
    let cells = f64::from(resolution);
    let step_x = bbox.width() / cells;
    let step_y = bbox.height() / cells;
    let min = bbox.min();

    (0..resolution)
        .flat_map(|row| {
            (0..resolution).map(move |column| Coord {
                x: min.x + (f64::from(column) + 0.5) * step_x,
                y: min.y + (f64::from(row) + 0.5) * step_y,
            })
        })
        .collect()
}

/// Exact, hashable identity of a coordinate.
///
/// Graph nodes are keyed by exact coordinate equality. Negative zero is
/// folded into positive zero so both spellings address the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordKey {
    x: u64,
    y: u64,
}

impl CoordKey {
    /// Build the key for `coord`.
    #[must_use]
    pub fn new(coord: Coord<f64>) -> Self {
        Self {
            x: normalise_zero(coord.x).to_bits(),
            y: normalise_zero(coord.y).to_bits(),
        }
    }

    /// Coordinate addressed by this key.
    #[must_use]
    pub fn coord(self) -> Coord<f64> {
        Coord {
            x: f64::from_bits(self.x),
            y: f64::from_bits(self.y),
        }
    }
}

impl From<Coord<f64>> for CoordKey {
    fn from(coord: Coord<f64>) -> Self {
        Self::new(coord)
    }
}

/// Fold `-0.0` into `0.0`, leaving every other value untouched.
#[must_use]
pub fn normalise_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

/// Normalise both axes of `coord` with [`normalise_zero`].
#[must_use]
pub fn normalise_coord(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: normalise_zero(coord.x),
        y: normalise_zero(coord.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn coord(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[rstest]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_distance(coord(0.0, 0.0), coord(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 50.0, "unexpected distance {d}");
    }

    #[rstest]
    fn haversine_is_symmetric() {
        let a = coord(2.35, 48.85);
        let b = coord(2.29, 48.86);
        assert!((haversine_distance(a, b) - haversine_distance(b, a)).abs() < 1e-9);
    }

    #[rstest]
    fn polyline_length_sums_segments() {
        let line = LineString::from(vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]);
        let total = polyline_length(&line);
        let direct = haversine_distance(coord(0.0, 0.0), coord(0.0, 2.0));
        assert!((total - direct).abs() < 1e-6);
    }

    #[rstest]
    fn polyline_length_of_single_point_is_zero() {
        let line = LineString::from(vec![(1.0, 1.0)]);
        assert_eq!(polyline_length(&line), 0.0);
    }

    #[rstest]
    fn radius_envelope_contains_points_at_radius() {
        let centre = coord(2.35, 48.85);
        let envelope = radius_envelope(centre, 1_000.0);
        let north = coord(2.35, 48.85 + 1_000.0 / 111_195.0);
        assert!(envelope.min().y <= north.y && north.y <= envelope.max().y);
        assert!(envelope.width() > envelope.height());
    }

    #[rstest]
    #[case(0.0)]
    #[case(48.85)]
    #[case(-70.0)]
    fn radius_envelope_holds_every_bearing(#[case] latitude: f64) {
        let centre = coord(2.35, latitude);
        let radius = 1_000.0;
        let envelope = radius_envelope(centre, radius);
        let angular = radius / EARTH_RADIUS_M;
        let (lat1, lon1) = (latitude.to_radians(), centre.x.to_radians());
        for step in 0..360 {
            let bearing = f64::from(step).to_radians();
            // Destination point at exactly `radius` along `bearing`.
            let lat2 = (lat1.sin() * angular.cos()
                + lat1.cos() * angular.sin() * bearing.cos())
            .asin();
            let lon2 = lon1
                + (bearing.sin() * angular.sin() * lat1.cos())
                    .atan2(angular.cos() - lat1.sin() * lat2.sin());
            let point = coord(lon2.to_degrees(), lat2.to_degrees());
            assert!(
                envelope.min().x <= point.x
                    && point.x <= envelope.max().x
                    && envelope.min().y <= point.y
                    && point.y <= envelope.max().y,
                "bearing {step} at latitude {latitude} escapes the envelope"
            );
        }
    }

    #[rstest]
    fn bounding_box_of_empty_input_is_none() {
        assert!(bounding_box(std::iter::empty()).is_none());
    }

    #[rstest]
    fn bounding_box_spans_all_points() {
        let bbox = bounding_box([coord(1.0, 5.0), coord(-2.0, 3.0), coord(4.0, -1.0)])
            .expect("non-empty input");
        assert_eq!(bbox.min(), coord(-2.0, -1.0));
        assert_eq!(bbox.max(), coord(4.0, 5.0));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(3, 9)]
    fn grid_emits_resolution_squared_cells(#[case] resolution: u32, #[case] expected: usize) {
        let bbox = Rect::new(coord(0.0, 0.0), coord(3.0, 3.0));
        assert_eq!(grid_cell_centres(bbox, resolution).len(), expected);
    }

    #[rstest]
    fn grid_cells_are_centred() {
        let bbox = Rect::new(coord(0.0, 0.0), coord(2.0, 2.0));
        let cells = grid_cell_centres(bbox, 2);
        assert_eq!(
            cells,
            vec![
                coord(0.5, 0.5),
                coord(1.5, 0.5),
                coord(0.5, 1.5),
                coord(1.5, 1.5)
            ]
        );
    }

    #[rstest]
    fn coord_key_folds_negative_zero() {
        assert_eq!(CoordKey::new(coord(-0.0, 1.0)), CoordKey::new(coord(0.0, 1.0)));
    }

    #[rstest]
    fn coord_key_distinguishes_nearby_points() {
        assert_ne!(
            CoordKey::new(coord(1.0, 1.0)),
            CoordKey::new(coord(1.0 + f64::EPSILON, 1.0))
        );
    }

    #[rstest]
    fn coord_key_round_trips_coordinate() {
        let c = coord(2.349_014, 48.864_716);
        assert_eq!(CoordKey::new(c).coord(), c);
    }
}
