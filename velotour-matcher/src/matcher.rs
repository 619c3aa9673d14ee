//! Answering ride requests from the resolved catalogue.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use geo::Coord;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use velotour_core::{
    DistanceBand, Path, PathQuery, PathStore, RestaurantStore, SegmentStore, type_popularity,
};

use crate::cache::{RequestSignature, StartingPointCache};
use crate::wire::{
    Feature, FeatureCollection, FeatureProperties, GeoPoint, Geometry, PathRequest,
    StartingPointRequest, StartingPointResponse,
};
use crate::{MatchError, MatcherConfig, ValidationError};

/// Online matcher over a read-only catalogue.
///
/// Only paths whose routes and restaurants are both resolved are ever
/// returned. Apart from the dedupe cache and the random generator, both
/// guarded by mutexes, the matcher holds no mutable state, so one instance
/// can serve concurrent requests when the store allows it.
///
/// # Examples
/// ```
/// use geo::{Coord, LineString};
/// use velotour_core::{MemoryStore, NewPath, PathStore, Restaurant, RouteSegment};
/// use velotour_matcher::{RuntimeMatcher, StartingPointRequest};
///
/// let start = Coord { x: 0.0, y: 0.0 };
/// let mut store = MemoryStore::new(
///     [RouteSegment::new(1, LineString::from(vec![(0.0, 0.0), (0.045, 0.0)]), 5_000.0)],
///     [Restaurant::new(1, start, "bistro", "Chez Nous")],
/// );
/// let ids = store
///     .insert_paths(&[NewPath {
///         start,
///         end: Coord { x: 0.045, y: 0.0 },
///         target_length: 5_000.0,
///         resolved_length: 5_000.0,
///     }])
///     .unwrap();
/// for id in ids {
///     store.set_routes(id, vec![1]).unwrap();
///     store.set_restaurants(id, Vec::new()).unwrap();
/// }
///
/// let matcher = RuntimeMatcher::new(store).with_seed(7);
/// let request = StartingPointRequest { length: 5_000, types: Vec::new() };
/// let response = matcher.select_starting_point(&request).unwrap();
/// assert_eq!(response.starting_point.coord(), start);
/// ```
#[derive(Debug)]
pub struct RuntimeMatcher<S> {
    store: S,
    config: MatcherConfig,
    cache: StartingPointCache,
    rng: Mutex<StdRng>,
}

impl<S> RuntimeMatcher<S>
where
    S: PathStore + SegmentStore + RestaurantStore,
{
    /// Construct a matcher with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, MatcherConfig::default())
    }

    /// Construct a matcher with an explicit configuration.
    pub fn with_config(store: S, config: MatcherConfig) -> Self {
        Self {
            store,
            cache: StartingPointCache::new(config.cache),
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the random generator with one seeded by `seed`.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// The dedupe cache, for exporting or restoring its windows.
    pub const fn cache(&self) -> &StartingPointCache {
        &self.cache
    }

    /// The configuration in use.
    pub const fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Restaurant types requests may name, most common first.
    ///
    /// Types with fewer than `min_type_count` restaurants are left out.
    ///
    /// # Errors
    /// Returns [`MatchError::Store`] when the restaurants cannot be read.
    pub fn known_types(&self) -> Result<Vec<String>, MatchError> {
        let restaurants = self
            .store
            .restaurants()
            .map_err(MatchError::store("read restaurants"))?;
        Ok(type_popularity(&restaurants)
            .into_iter()
            .filter(|(_, count)| *count >= self.config.min_type_count)
            .map(|(kind, _)| kind)
            .collect())
    }

    /// Every catalogued starting point, as `[longitude, latitude]` pairs in
    /// catalogue order.
    ///
    /// # Errors
    /// Returns [`MatchError::Store`] when the catalogue cannot be read.
    pub fn starting_points(&self) -> Result<Vec<[f64; 2]>, MatchError> {
        Ok(self
            .store
            .starting_points()
            .map_err(MatchError::store("list starting points"))?
            .into_iter()
            .map(|start| [start.x, start.y])
            .collect())
    }

    /// Pick a starting point offering a ride of about `request.length`.
    ///
    /// Matching paths are grouped by starting point, up to `sample_size`
    /// of those points are sampled at random, skipping points recently
    /// returned for the same request, and one is chosen uniformly. When
    /// every candidate was recently returned the draw is repeated without
    /// that exclusion.
    ///
    /// # Errors
    /// Returns [`MatchError::Validation`] for a rejected request and
    /// [`MatchError::NoStartingPoint`] when no path qualifies.
    pub fn select_starting_point(
        &self,
        request: &StartingPointRequest,
    ) -> Result<StartingPointResponse, MatchError> {
        let band = self.validate_length(request.length)?;
        let types = self.validate_types(&request.types)?;
        let signature = RequestSignature::new(request.length, &types);

        let min_stops = if types.is_empty() {
            0
        } else {
            self.config.min_stops
        };
        let base = PathQuery {
            types,
            min_stops,
            distinct_starts: true,
            ..PathQuery::within(band)
        };
        let mut considered = 0;
        let start = self
            .cache
            .draw(signature, |recent| -> Result<_, MatchError> {
                let mut query = PathQuery {
                    exclude_starts: recent.to_vec(),
                    ..base
                };
                let mut candidates = self
                    .store
                    .find_paths(&query)
                    .map_err(MatchError::store("query starting points"))?;
                if candidates.is_empty() && !query.exclude_starts.is_empty() {
                    debug!(
                        "every candidate for {} m was recently returned; retrying without exclusions",
                        request.length
                    );
                    query.exclude_starts.clear();
                    candidates = self
                        .store
                        .find_paths(&query)
                        .map_err(MatchError::store("query starting points"))?;
                }
                considered = candidates.len();
                Ok(self.choose(&candidates))
            })?
            .ok_or(MatchError::NoStartingPoint {
                length: request.length,
            })?;
        info!(
            "starting point ({}, {}) chosen among {considered} starting points for {} m",
            start.x, start.y, request.length
        );
        Ok(StartingPointResponse {
            starting_point: GeoPoint::from(start),
        })
    }

    /// Assemble the ride starting at `request.starting_point`.
    ///
    /// The lowest-id path matching the length, starting point, restaurant
    /// types and stop count is returned as a feature collection.
    ///
    /// # Errors
    /// Returns [`MatchError::Validation`] for a rejected request,
    /// [`MatchError::NoPath`] when no path qualifies and
    /// [`MatchError::Store`] when the path's segments or restaurants cannot
    /// be read.
    pub fn select_path(&self, request: &PathRequest) -> Result<FeatureCollection, MatchError> {
        let band = self.validate_length(request.length)?;
        let types = self.validate_types(&request.types)?;
        let start = validate_point(&request.starting_point)?;
        let stops = usize::try_from(request.number_of_stops).unwrap_or(usize::MAX);

        let query = PathQuery {
            start: Some(start),
            types,
            min_stops: stops,
            limit: Some(1),
            ..PathQuery::within(band)
        };
        let path = self
            .store
            .find_paths(&query)
            .map_err(MatchError::store("query paths"))?
            .into_iter()
            .next()
            .ok_or(MatchError::NoPath {
                length: request.length,
            })?;
        debug!("path {} selected for {} m", path.id, request.length);

        let mut features = self.restaurant_features(&path, &query.types, stops)?;
        features.push(self.route_feature(&path)?);
        Ok(FeatureCollection { features })
    }

    fn restaurant_features(
        &self,
        path: &Path,
        types: &[String],
        stops: usize,
    ) -> Result<Vec<Feature>, MatchError> {
        let limit = if stops == 0 { usize::MAX } else { stops };
        let wanted: Vec<u64> = path
            .qualifying_restaurants(types)
            .take(limit)
            .map(|restaurant| restaurant.id)
            .collect();
        let mut found: HashMap<u64, _> = self
            .store
            .restaurants_by_id(&wanted)
            .map_err(MatchError::store("read path restaurants"))?
            .into_iter()
            .map(|restaurant| (restaurant.id, restaurant))
            .collect();

        let mut features = Vec::with_capacity(wanted.len());
        for id in wanted {
            let Some(restaurant) = found.remove(&id) else {
                warn!("path {}: restaurant {id} is missing from the store", path.id);
                continue;
            };
            features.push(Feature {
                geometry: Geometry::Point {
                    coordinates: [restaurant.location.x, restaurant.location.y],
                },
                properties: FeatureProperties::Restaurant {
                    id: restaurant.id,
                    kind: restaurant.kind,
                    name: restaurant.name,
                },
            });
        }
        Ok(features)
    }

    fn route_feature(&self, path: &Path) -> Result<Feature, MatchError> {
        let routes = path.routes.as_deref().unwrap_or_default();
        let lines: Vec<Vec<[f64; 2]>> = self
            .store
            .segments_by_id(routes)
            .map_err(MatchError::store("read path segments"))?
            .into_iter()
            .map(|segment| {
                segment
                    .geometry
                    .coords()
                    .map(|coord| [coord.x, coord.y])
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(Feature {
            geometry: Geometry::MultiLineString { coordinates: lines },
            properties: FeatureProperties::Route {
                length: path.resolved_length,
                path_id: path.id,
            },
        })
    }

    fn validate_length(&self, length: u32) -> Result<DistanceBand, MatchError> {
        if length == 0 {
            return Err(ValidationError::ZeroLength.into());
        }
        let metres = f64::from(length);
        if metres > self.config.max_length_m {
            return Err(ValidationError::LengthTooLong {
                length,
                max: self.config.max_length_m,
            }
            .into());
        }
        self.config
            .tolerance
            .band(metres)
            .map_err(|source| MatchError::Tolerance { length, source })
    }

    fn validate_types(&self, types: &[String]) -> Result<Vec<String>, MatchError> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let known = self.known_types()?;
        if let Some(unknown) = types.iter().find(|&kind| !known.contains(kind)) {
            return Err(ValidationError::UnknownType {
                kind: unknown.clone(),
            }
            .into());
        }
        let mut canonical = types.to_vec();
        canonical.sort_unstable();
        canonical.dedup();
        Ok(canonical)
    }

    fn choose(&self, candidates: &[Path]) -> Option<Coord<f64>> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let sample: Vec<&Path> = candidates
            .choose_multiple(&mut *rng, self.config.sample_size)
            .collect();
        sample.choose(&mut *rng).map(|path| path.start)
    }
}

fn validate_point(point: &GeoPoint) -> Result<Coord<f64>, ValidationError> {
    if point.kind != GeoPoint::KIND {
        return Err(ValidationError::NotAPoint {
            kind: point.kind.clone(),
        });
    }
    let coord = point.coord();
    if !(coord.x.is_finite() && coord.y.is_finite()) {
        return Err(ValidationError::NonFiniteCoordinates);
    }
    Ok(coord)
}
