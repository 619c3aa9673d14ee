//! Fixture builders shared by unit and behaviour tests across the workspace.

use geo::{Coord, LineString};

use crate::{NewPath, Path, PathRestaurant, Restaurant, RouteSegment};

/// Spacing between grid intersections in degrees, roughly 1.1 km at the
/// equator.
pub const GRID_STEP: f64 = 0.01;

/// Coordinate of grid intersection `(column, row)`.
#[must_use]
pub fn grid_point(column: u32, row: u32) -> Coord<f64> {
    Coord {
        x: f64::from(column) * GRID_STEP,
        y: f64::from(row) * GRID_STEP,
    }
}

/// Directed street grid of `columns` × `rows` intersections.
///
/// Every street is emitted in both directions, so each neighbouring pair of
/// intersections is joined by two segments. Lengths are measured from the
/// geometry. Segment ids start at 1.
#[must_use]
pub fn grid_segments(columns: u32, rows: u32) -> Vec<RouteSegment> {
    let mut pairs = Vec::new();
    for row in 0..rows {
        for column in 0..columns {
            let here = grid_point(column, row);
            if column + 1 < columns {
                let east = grid_point(column + 1, row);
                pairs.push((here, east));
                pairs.push((east, here));
            }
            if row + 1 < rows {
                let north = grid_point(column, row + 1);
                pairs.push((here, north));
                pairs.push((north, here));
            }
        }
    }
    pairs
        .into_iter()
        .zip(1..)
        .map(|((from, to), id)| RouteSegment::measured(id, LineString::from(vec![from, to])))
        .collect()
}

/// Restaurant with a generated name.
#[must_use]
pub fn restaurant(id: u64, location: Coord<f64>, kind: &str) -> Restaurant {
    Restaurant::new(id, location, kind, format!("{kind} #{id}"))
}

/// Path with routes and restaurants already resolved.
#[must_use]
pub fn resolved_path(
    id: u64,
    start: Coord<f64>,
    resolved_length: f64,
    restaurants: &[(u64, &str)],
) -> Path {
    let mut path = Path::from_new(
        id,
        NewPath {
            start,
            end: Coord {
                x: start.x + GRID_STEP,
                y: start.y,
            },
            target_length: resolved_length,
            resolved_length,
        },
    );
    path.routes = Some(vec![id]);
    path.restaurants = Some(
        restaurants
            .iter()
            .map(|(restaurant, kind)| PathRestaurant::new(*restaurant, *kind))
            .collect(),
    );
    path
}
