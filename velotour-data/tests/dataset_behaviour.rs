//! Behavioural tests for loading GeoJSON datasets into SQLite.

use std::cell::RefCell;

use camino::{Utf8Path, Utf8PathBuf};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;
use velotour_core::{RestaurantStore, SegmentStore, SqliteStore};
use velotour_data::{DatasetError, SeedError, seed_from_files};

/// Input files for the seed.
pub struct Inputs {
    segments: Utf8PathBuf,
    restaurants: Utf8PathBuf,
}

/// Temporary directory receiving the database.
pub struct Scratch {
    _dir: TempDir,
    root: Utf8PathBuf,
}

fn fixtures_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Dataset files chosen by a `given` step.
#[fixture]
pub fn inputs() -> RefCell<Option<Inputs>> {
    RefCell::new(None)
}

/// Directory the database is written under.
#[fixture]
pub fn scratch() -> Scratch {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("non UTF-8 tempdir {path:?}"));
    Scratch { _dir: dir, root }
}

/// Outcome of the seed.
#[fixture]
pub fn outcome() -> RefCell<Option<Result<SqliteStore, SeedError>>> {
    RefCell::new(None)
}

#[given("the sample GeoJSON files")]
fn sample_files(inputs: &RefCell<Option<Inputs>>) {
    let dir = fixtures_dir();
    *inputs.borrow_mut() = Some(Inputs {
        segments: dir.join("segments.geojson"),
        restaurants: dir.join("restaurants.geojson"),
    });
}

#[given("a segments file that does not exist")]
fn missing_segments(inputs: &RefCell<Option<Inputs>>) {
    let dir = fixtures_dir();
    *inputs.borrow_mut() = Some(Inputs {
        segments: dir.join("no-such-segments.geojson"),
        restaurants: dir.join("restaurants.geojson"),
    });
}

#[when("I seed a database inside a new directory")]
fn seed(
    inputs: &RefCell<Option<Inputs>>,
    scratch: &Scratch,
    outcome: &RefCell<Option<Result<SqliteStore, SeedError>>>,
) {
    let binding = inputs.borrow();
    let inputs = binding
        .as_ref()
        .unwrap_or_else(|| panic!("inputs must be chosen"));
    let db_path = scratch.root.join("nested/velotour.db");
    *outcome.borrow_mut() = Some(seed_from_files(
        &db_path,
        &inputs.segments,
        &inputs.restaurants,
    ));
}

fn with_store<T>(
    outcome: &RefCell<Option<Result<SqliteStore, SeedError>>>,
    f: impl FnOnce(&SqliteStore) -> T,
) -> T {
    match outcome.borrow().as_ref() {
        Some(Ok(store)) => f(store),
        Some(Err(err)) => panic!("seed failed: {err}"),
        None => panic!("seed must have run"),
    }
}

#[then("the database holds 4 route segments and 3 restaurants")]
fn counts(outcome: &RefCell<Option<Result<SqliteStore, SeedError>>>) {
    with_store(outcome, |store| {
        let segments = store
            .segments()
            .unwrap_or_else(|err| panic!("segments: {err}"));
        let restaurants = store
            .restaurants()
            .unwrap_or_else(|err| panic!("restaurants: {err}"));
        assert_eq!(segments.len(), 4);
        assert_eq!(restaurants.len(), 3);
    });
}

#[then("the first segment keeps its surveyed length of 780 metres")]
fn surveyed_length(outcome: &RefCell<Option<Result<SqliteStore, SeedError>>>) {
    with_store(outcome, |store| {
        let segments = store
            .segments_by_id(&[1])
            .unwrap_or_else(|err| panic!("segment 1: {err}"));
        let lengths: Vec<f64> = segments.iter().map(|segment| segment.length).collect();
        assert_eq!(lengths, vec![780.0]);
    });
}

#[then("the second restaurant is the bistro named \"Bistro du Coin\"")]
fn bistro(outcome: &RefCell<Option<Result<SqliteStore, SeedError>>>) {
    with_store(outcome, |store| {
        let restaurants = store
            .restaurants_by_id(&[2])
            .unwrap_or_else(|err| panic!("restaurant 2: {err}"));
        let summary: Vec<(&str, &str)> = restaurants
            .iter()
            .map(|r| (r.kind.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(summary, vec![("bistro", "Bistro du Coin")]);
    });
}

#[then("seeding fails naming the missing file")]
fn fails_on_missing(
    inputs: &RefCell<Option<Inputs>>,
    outcome: &RefCell<Option<Result<SqliteStore, SeedError>>>,
) {
    let expected = inputs
        .borrow()
        .as_ref()
        .map(|inputs| inputs.segments.clone())
        .unwrap_or_else(|| panic!("inputs must be chosen"));
    match outcome.borrow().as_ref() {
        Some(Err(SeedError::Dataset(DatasetError::Read { path, .. }))) => {
            assert_eq!(path.as_path(), Utf8Path::new(&expected));
        }
        Some(Err(other)) => panic!("unexpected error: {other}"),
        Some(Ok(_)) => panic!("seed unexpectedly succeeded"),
        None => panic!("seed must have run"),
    }
}

#[scenario(path = "tests/features/dataset.feature", index = 0)]
fn sample_is_seeded(
    inputs: RefCell<Option<Inputs>>,
    scratch: Scratch,
    outcome: RefCell<Option<Result<SqliteStore, SeedError>>>,
) {
    let _ = (inputs, scratch, outcome);
}

#[scenario(path = "tests/features/dataset.feature", index = 1)]
fn missing_file_stops_seed(
    inputs: RefCell<Option<Inputs>>,
    scratch: Scratch,
    outcome: RefCell<Option<Result<SqliteStore, SeedError>>>,
) {
    let _ = (inputs, scratch, outcome);
}
