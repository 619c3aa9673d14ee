//! Behavioural coverage for the runtime matcher.

use std::cell::RefCell;

use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use velotour_core::MemoryStore;
use velotour_core::test_support::{grid_point, grid_segments, resolved_path, restaurant};
use velotour_matcher::{
    FeatureCollection, FeatureProperties, GeoPoint, MatchError, PathRequest, RuntimeMatcher,
    StartingPointRequest,
};

/// Matcher under test.
#[fixture]
pub fn matcher() -> RefCell<Option<RuntimeMatcher<MemoryStore>>> {
    RefCell::new(None)
}

/// Outcome of the latest path request.
#[fixture]
pub fn ride() -> RefCell<Option<Result<FeatureCollection, MatchError>>> {
    RefCell::new(None)
}

/// Starting points returned so far, oldest first.
#[fixture]
pub fn answers() -> RefCell<Vec<Coord<f64>>> {
    RefCell::new(Vec::new())
}

fn store() -> MemoryStore {
    MemoryStore::new(
        grid_segments(5, 2),
        [
            restaurant(1, grid_point(0, 0), "pizza"),
            restaurant(2, grid_point(1, 0), "pizza"),
            restaurant(3, grid_point(2, 0), "bistro"),
        ],
    )
}

#[given("a catalogue with one 5100 metre path from the origin passing two pizzerias")]
fn one_path(matcher: &RefCell<Option<RuntimeMatcher<MemoryStore>>>) {
    let mut store = store();
    store.insert_path(resolved_path(
        1,
        grid_point(0, 0),
        5_100.0,
        &[(1, "pizza"), (3, "bistro"), (2, "pizza")],
    ));
    *matcher.borrow_mut() = Some(RuntimeMatcher::new(store).with_seed(3));
}

#[given("a catalogue with five 5000 metre paths from different corners")]
fn five_paths(matcher: &RefCell<Option<RuntimeMatcher<MemoryStore>>>) {
    let mut store = store();
    for (id, column) in (1..=5).zip(0..) {
        store.insert_path(resolved_path(id, grid_point(column, 1), 5_000.0, &[]));
    }
    *matcher.borrow_mut() = Some(RuntimeMatcher::new(store).with_seed(11));
}

fn request_ride(
    matcher: &RefCell<Option<RuntimeMatcher<MemoryStore>>>,
    ride: &RefCell<Option<Result<FeatureCollection, MatchError>>>,
    types: Vec<String>,
    number_of_stops: u32,
) {
    let binding = matcher.borrow();
    let matcher = binding
        .as_ref()
        .unwrap_or_else(|| panic!("catalogue must be loaded"));
    let request = PathRequest {
        length: 5_000,
        starting_point: GeoPoint::from(grid_point(0, 0)),
        types,
        number_of_stops,
    };
    *ride.borrow_mut() = Some(matcher.select_path(&request));
}

#[when("I ask for a 5000 metre ride from the origin with no stop requirement")]
fn ask_any_ride(
    matcher: &RefCell<Option<RuntimeMatcher<MemoryStore>>>,
    ride: &RefCell<Option<Result<FeatureCollection, MatchError>>>,
) {
    request_ride(matcher, ride, Vec::new(), 0);
}

#[when("I ask for a 5000 metre ride from the origin with 3 pizza stops")]
fn ask_pizza_ride(
    matcher: &RefCell<Option<RuntimeMatcher<MemoryStore>>>,
    ride: &RefCell<Option<Result<FeatureCollection, MatchError>>>,
) {
    request_ride(matcher, ride, vec!["pizza".to_owned()], 3);
}

#[when("I ask for a 5000 metre starting point 12 times")]
fn ask_starting_points(
    matcher: &RefCell<Option<RuntimeMatcher<MemoryStore>>>,
    answers: &RefCell<Vec<Coord<f64>>>,
) {
    let binding = matcher.borrow();
    let matcher = binding
        .as_ref()
        .unwrap_or_else(|| panic!("catalogue must be loaded"));
    let request = StartingPointRequest {
        length: 5_000,
        types: Vec::new(),
    };
    for _ in 0..12 {
        let response = matcher
            .select_starting_point(&request)
            .unwrap_or_else(|err| panic!("starting point: {err}"));
        answers.borrow_mut().push(response.starting_point.coord());
    }
}

fn successful_ride(
    ride: &RefCell<Option<Result<FeatureCollection, MatchError>>>,
) -> FeatureCollection {
    match ride.borrow().as_ref() {
        Some(Ok(collection)) => collection.clone(),
        Some(Err(err)) => panic!("ride request failed: {err}"),
        None => panic!("ride must have been requested"),
    }
}

#[then("the ride follows path 1")]
fn follows_path(ride: &RefCell<Option<Result<FeatureCollection, MatchError>>>) {
    let collection = successful_ride(ride);
    let route = collection
        .features
        .last()
        .unwrap_or_else(|| panic!("ride has no features"));
    assert!(matches!(
        route.properties,
        FeatureProperties::Route { path_id: 1, .. }
    ));
}

#[then("the ride lists both pizzerias")]
fn lists_pizzerias(ride: &RefCell<Option<Result<FeatureCollection, MatchError>>>) {
    let pizzerias = successful_ride(ride)
        .features
        .iter()
        .filter(|feature| {
            matches!(&feature.properties, FeatureProperties::Restaurant { kind, .. } if kind == "pizza")
        })
        .count();
    assert_eq!(pizzerias, 2);
}

#[then("the request fails with status 400")]
fn fails_with_400(ride: &RefCell<Option<Result<FeatureCollection, MatchError>>>) {
    match ride.borrow().as_ref() {
        Some(Err(err)) => assert_eq!(err.status_code(), 400),
        Some(Ok(collection)) => panic!("unexpected ride: {collection:?}"),
        None => panic!("ride must have been requested"),
    }
}

#[then("no answer repeats any of the three answers before it")]
fn answers_rotate(answers: &RefCell<Vec<Coord<f64>>>) {
    let answers = answers.borrow();
    assert_eq!(answers.len(), 12);
    for window in answers.windows(4) {
        if let [earlier @ .., latest] = window {
            assert!(
                earlier.iter().all(|previous| previous != latest),
                "{latest:?} repeated within {earlier:?}"
            );
        }
    }
}

#[scenario(path = "tests/features/matcher.feature", index = 0)]
fn longer_path_matches(
    matcher: RefCell<Option<RuntimeMatcher<MemoryStore>>>,
    ride: RefCell<Option<Result<FeatureCollection, MatchError>>>,
) {
    let _ = (matcher, ride);
}

#[scenario(path = "tests/features/matcher.feature", index = 1)]
fn too_few_stops(
    matcher: RefCell<Option<RuntimeMatcher<MemoryStore>>>,
    ride: RefCell<Option<Result<FeatureCollection, MatchError>>>,
) {
    let _ = (matcher, ride);
}

#[scenario(path = "tests/features/matcher.feature", index = 2)]
fn starting_points_rotate(
    matcher: RefCell<Option<RuntimeMatcher<MemoryStore>>>,
    answers: RefCell<Vec<Coord<f64>>>,
) {
    let _ = (matcher, answers);
}
