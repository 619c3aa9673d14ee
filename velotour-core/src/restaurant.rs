use std::collections::HashMap;

use geo::Coord;

/// An eatery a cyclist may stop at along a route.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. The
/// `kind` is a free-form cuisine or venue category such as `"pizzeria"`.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use velotour_core::Restaurant;
///
/// let restaurant = Restaurant::new(1, Coord { x: 2.35, y: 48.85 }, "bistro", "Chez Nous");
///
/// assert_eq!(restaurant.id, 1);
/// assert_eq!(restaurant.kind, "bistro");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Restaurant {
    pub id: u64,
    pub location: Coord<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    pub name: String,
}

impl Restaurant {
    /// Construct a `Restaurant`.
    pub fn new(
        id: u64,
        location: Coord<f64>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            location,
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Count restaurants per type, most common first.
///
/// Ties are broken alphabetically so the ordering is stable across runs.
#[must_use]
pub fn type_popularity<'a, I>(restaurants: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a Restaurant>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for restaurant in restaurants {
        *counts.entry(restaurant.kind.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(kind, count)| (kind.to_owned(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: u64, kind: &str) -> Restaurant {
        Restaurant::new(id, Coord { x: 0.0, y: 0.0 }, kind, format!("r{id}"))
    }

    #[test]
    fn popularity_orders_by_count_then_name() {
        let restaurants = [
            at(1, "pizzeria"),
            at(2, "bistro"),
            at(3, "pizzeria"),
            at(4, "creperie"),
        ];
        let ranked = type_popularity(&restaurants);
        assert_eq!(
            ranked,
            vec![
                ("pizzeria".to_owned(), 2),
                ("bistro".to_owned(), 1),
                ("creperie".to_owned(), 1),
            ]
        );
    }

    #[test]
    fn popularity_of_nothing_is_empty() {
        assert!(type_popularity(std::iter::empty()).is_empty());
    }
}
