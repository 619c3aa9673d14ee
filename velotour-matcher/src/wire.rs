//! Request and response bodies of the matcher's HTTP contract.
//!
//! - `POST /starting_point` takes a [`StartingPointRequest`] and answers with
//!   a [`StartingPointResponse`].
//! - `POST /parcours` takes a [`PathRequest`] and answers with a GeoJSON
//!   [`FeatureCollection`].
//! - `GET /type` answers with the known restaurant types as a JSON array.
//! - `GET /starting_points` answers with every catalogued starting point as
//!   an array of `[longitude, latitude]` positions.

use geo::Coord;
use serde::{Deserialize, Serialize};

/// Body of a starting-point request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingPointRequest {
    /// Desired ride length in metres.
    pub length: u32,
    /// Restaurant types the ride should pass; empty means any.
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
}

/// Body of a path request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRequest {
    /// Desired ride length in metres.
    pub length: u32,
    /// Starting point previously returned by the matcher.
    pub starting_point: GeoPoint,
    /// Restaurant types the ride should pass; empty means any.
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    /// Restaurants the ride should pass; zero means no requirement.
    #[serde(default)]
    pub number_of_stops: u32,
}

/// A GeoJSON `Point` geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Geometry type; always `"Point"` for valid input.
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    /// The GeoJSON geometry type of a point.
    pub const KIND: &'static str = "Point";

    /// Coordinate of the point.
    #[must_use]
    pub const fn coord(&self) -> Coord<f64> {
        let [x, y] = self.coordinates;
        Coord { x, y }
    }
}

impl From<Coord<f64>> for GeoPoint {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            kind: Self::KIND.to_owned(),
            coordinates: [coord.x, coord.y],
        }
    }
}

/// Body of a starting-point response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingPointResponse {
    /// Where the recommended ride starts.
    pub starting_point: GeoPoint,
}

/// A GeoJSON `FeatureCollection` describing one ride.
///
/// Restaurant point features come first, in route order, followed by a
/// single multi-line feature holding the route geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    /// Features of the ride.
    pub features: Vec<Feature>,
}

/// A GeoJSON `Feature`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    /// Geometry of the feature.
    pub geometry: Geometry,
    /// Properties attached to the feature.
    pub properties: FeatureProperties,
}

/// GeoJSON geometries emitted by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position.
    Point {
        /// `[longitude, latitude]`.
        coordinates: [f64; 2],
    },
    /// One line string per route segment, in route order.
    MultiLineString {
        /// Positions of every line.
        coordinates: Vec<Vec<[f64; 2]>>,
    },
}

/// Properties of a ride feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureProperties {
    /// A restaurant stop.
    Restaurant {
        /// Restaurant identifier.
        id: u64,
        /// Restaurant type.
        #[serde(rename = "type")]
        kind: String,
        /// Display name.
        name: String,
    },
    /// The route itself.
    Route {
        /// Length of the route in metres.
        length: f64,
        /// Identifier of the catalogued path.
        path_id: u64,
    },
}
