//! Catalogued candidate rides.
//!
//! A [`Path`] starts life as a [`NewPath`] emitted by the catalog builder:
//! two graph nodes joined by a simple path whose length falls within the
//! tolerance band of a target distance. Later stages fill in the ordered
//! route segments and the restaurants reachable along them.

use geo::Coord;

/// A restaurant reference carried by a resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathRestaurant {
    pub id: u64,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
}

impl PathRestaurant {
    /// Construct a restaurant reference.
    pub fn new(id: u64, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
        }
    }
}

/// A path about to be persisted; the store assigns its identifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPath {
    /// Coordinate of the starting graph node.
    pub start: Coord<f64>,
    /// Coordinate of the final graph node.
    pub end: Coord<f64>,
    /// Distance the path was catalogued for, in metres.
    pub target_length: f64,
    /// Total edge distance of the discovered path, in metres.
    pub resolved_length: f64,
}

/// A persisted catalogue entry.
///
/// `routes` and `restaurants` are `None` until the corresponding resolver
/// has processed the path. `routes` is an ordered list of segment ids from
/// `start` to `end`; `restaurants` keeps first-seen order without duplicates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    pub id: u64,
    pub start: Coord<f64>,
    pub end: Coord<f64>,
    pub target_length: f64,
    pub resolved_length: f64,
    pub routes: Option<Vec<u64>>,
    pub restaurants: Option<Vec<PathRestaurant>>,
}

impl Path {
    /// Build an unresolved path from a [`NewPath`] and its identifier.
    #[must_use]
    pub const fn from_new(id: u64, new: NewPath) -> Self {
        Self {
            id,
            start: new.start,
            end: new.end,
            target_length: new.target_length,
            resolved_length: new.resolved_length,
            routes: None,
            restaurants: None,
        }
    }

    /// Whether both resolvers have processed this path.
    ///
    /// Only matchable paths are visible to the runtime matcher.
    #[must_use]
    pub const fn is_matchable(&self) -> bool {
        self.routes.is_some() && self.restaurants.is_some()
    }

    /// Restaurants whose type is listed in `types`; every restaurant when
    /// `types` is empty.
    pub fn qualifying_restaurants<'a>(
        &'a self,
        types: &'a [String],
    ) -> impl Iterator<Item = &'a PathRestaurant> + 'a {
        self.restaurants
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(move |r| types.is_empty() || types.iter().any(|t| *t == r.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolved(restaurants: Vec<PathRestaurant>) -> Path {
        let mut path = Path::from_new(
            1,
            NewPath {
                start: Coord { x: 0.0, y: 0.0 },
                end: Coord { x: 1.0, y: 1.0 },
                target_length: 5_000.0,
                resolved_length: 5_100.0,
            },
        );
        path.routes = Some(vec![1, 2]);
        path.restaurants = Some(restaurants);
        path
    }

    #[rstest]
    fn new_paths_are_not_matchable() {
        let path = Path::from_new(
            3,
            NewPath {
                start: Coord { x: 0.0, y: 0.0 },
                end: Coord { x: 0.0, y: 0.0 },
                target_length: 1.0,
                resolved_length: 1.0,
            },
        );
        assert!(!path.is_matchable());
        assert!(path.routes.is_none());
    }

    #[rstest]
    fn empty_restaurant_list_is_still_matchable() {
        assert!(resolved(Vec::new()).is_matchable());
    }

    #[rstest]
    #[case(&[], 3)]
    #[case(&["pizzeria"], 2)]
    #[case(&["bistro", "pizzeria"], 3)]
    #[case(&["sushi"], 0)]
    fn qualifying_restaurants_filter_by_type(#[case] types: &[&str], #[case] expected: usize) {
        let path = resolved(vec![
            PathRestaurant::new(1, "pizzeria"),
            PathRestaurant::new(2, "bistro"),
            PathRestaurant::new(3, "pizzeria"),
        ]);
        let types: Vec<String> = types.iter().map(|t| (*t).to_owned()).collect();
        assert_eq!(path.qualifying_restaurants(&types).count(), expected);
    }
}
