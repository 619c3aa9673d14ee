//! GeoJSON readers for route segments and restaurants.
//!
//! Both readers take a `FeatureCollection` and assign identifiers from 1 in
//! file order, counting only the features that were kept.

use geo::{Coord, LineString};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use velotour_core::{Restaurant, RouteSegment};

use crate::DatasetError;

/// Property holding a surveyed segment length in metres.
pub const LENGTH_PROPERTY: &str = "LONGUEUR";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// Identifies the input in error messages.
struct Source<'a> {
    origin: &'a str,
}

impl Source<'_> {
    fn parse(&self, json: &str) -> Result<FeatureCollection, DatasetError> {
        serde_json::from_str(json).map_err(|source| DatasetError::Parse {
            origin: self.origin.to_owned(),
            source,
        })
    }

    fn invalid(&self, index: usize, geometry: &Geometry) -> DatasetError {
        DatasetError::InvalidCoordinates {
            origin: self.origin.to_owned(),
            index,
            geometry: geometry.kind.clone(),
        }
    }
}

/// Parse route segments from a GeoJSON `FeatureCollection`.
///
/// `LineString` features become one segment each; the parts of a
/// `MultiLineString` are joined into a single polyline. A numeric
/// [`LENGTH_PROPERTY`] sets the segment length, otherwise it is measured
/// from the geometry. Features with other or missing geometry are skipped.
///
/// # Errors
/// Returns [`DatasetError::Parse`] for malformed JSON and
/// [`DatasetError::InvalidCoordinates`] when a position is not a pair of
/// numbers.
///
/// # Examples
/// ```
/// use velotour_data::parse_segments;
///
/// let json = r#"{"type":"FeatureCollection","features":[{
///     "type":"Feature",
///     "geometry":{"type":"LineString","coordinates":[[0.0,0.0],[0.01,0.0]]},
///     "properties":{"LONGUEUR":1200.0}
/// }]}"#;
/// let segments = parse_segments(json, "inline").unwrap();
/// assert_eq!(segments[0].id, 1);
/// assert_eq!(segments[0].length, 1200.0);
/// ```
pub fn parse_segments(json: &str, origin: &str) -> Result<Vec<RouteSegment>, DatasetError> {
    let source = Source { origin };
    let collection = source.parse(json)?;
    let mut segments = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            warn!("{origin}: feature {index} has no geometry; skipped");
            continue;
        };
        let points = match geometry.kind.as_str() {
            "LineString" => line(&geometry.coordinates),
            "MultiLineString" => multi_line(&geometry.coordinates),
            other => {
                warn!("{origin}: feature {index} is a {other}, not a line; skipped");
                continue;
            }
        }
        .ok_or_else(|| source.invalid(index, &geometry))?;

        let id = next_id(segments.len());
        let geometry = LineString::from(points);
        let surveyed = feature
            .properties
            .as_ref()
            .and_then(|properties| properties.get(LENGTH_PROPERTY))
            .and_then(Value::as_f64);
        segments.push(match surveyed {
            Some(length) => RouteSegment::new(id, geometry, length),
            None => RouteSegment::measured(id, geometry),
        });
    }

    debug!("{origin}: parsed {} route segments", segments.len());
    Ok(segments)
}

/// Parse restaurants from a GeoJSON `FeatureCollection`.
///
/// Each `Point` feature needs a string `type` property; its display name is
/// read from `name`, falling back to `nom`. Features without a type or with
/// other geometry are skipped.
///
/// # Errors
/// Returns [`DatasetError::Parse`] for malformed JSON and
/// [`DatasetError::InvalidCoordinates`] for malformed points.
pub fn parse_restaurants(json: &str, origin: &str) -> Result<Vec<Restaurant>, DatasetError> {
    let source = Source { origin };
    let collection = source.parse(json)?;
    let mut restaurants = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry.filter(|geometry| geometry.kind == "Point") else {
            warn!("{origin}: feature {index} is not a point; skipped");
            continue;
        };
        let location = position(&geometry.coordinates)
            .ok_or_else(|| source.invalid(index, &geometry))?;
        let properties = feature.properties.unwrap_or_default();
        let Some(kind) = properties.get("type").and_then(Value::as_str) else {
            warn!("{origin}: feature {index} has no restaurant type; skipped");
            continue;
        };
        let name = ["name", "nom"]
            .iter()
            .find_map(|key| properties.get(*key).and_then(Value::as_str))
            .unwrap_or_default();

        restaurants.push(Restaurant::new(
            next_id(restaurants.len()),
            location,
            kind,
            name,
        ));
    }

    debug!("{origin}: parsed {} restaurants", restaurants.len());
    Ok(restaurants)
}

fn next_id(kept: usize) -> u64 {
    u64::try_from(kept).map_or(u64::MAX, |count| count.saturating_add(1))
}

fn position(value: &Value) -> Option<Coord<f64>> {
    match value.as_array()?.as_slice() {
        [x, y, ..] => {
            let coord = Coord {
                x: x.as_f64()?,
                y: y.as_f64()?,
            };
            (coord.x.is_finite() && coord.y.is_finite()).then_some(coord)
        }
        _ => None,
    }
}

fn line(value: &Value) -> Option<Vec<Coord<f64>>> {
    value.as_array()?.iter().map(position).collect()
}

/// Join the parts of a multi-line, dropping the repeated vertex where one
/// part starts exactly where the previous one ended.
fn multi_line(value: &Value) -> Option<Vec<Coord<f64>>> {
    let mut points: Vec<Coord<f64>> = Vec::new();
    for part in value.as_array()? {
        let part = line(part)?;
        let skip = usize::from(points.last().is_some() && points.last() == part.first());
        points.extend(part.into_iter().skip(skip));
    }
    Some(points)
}
