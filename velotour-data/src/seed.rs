//! Loading a dataset from disk and writing it into a SQLite store.

use camino::Utf8Path;
use log::info;
use velotour_core::{Restaurant, RouteSegment, SqliteStore};

use crate::fs::{ensure_parent_dir, read_utf8};
use crate::{DatasetError, SeedError, parse_restaurants, parse_segments};

/// Route segments and restaurants read from a pair of GeoJSON files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Cyclable route segments, ids from 1.
    pub segments: Vec<RouteSegment>,
    /// Restaurants, ids from 1.
    pub restaurants: Vec<Restaurant>,
}

impl Dataset {
    /// Read and parse both GeoJSON files.
    ///
    /// # Errors
    /// Returns [`DatasetError`] when either file cannot be read or parsed.
    pub fn load(segments: &Utf8Path, restaurants: &Utf8Path) -> Result<Self, DatasetError> {
        let dataset = Self {
            segments: parse_segments(&read(segments)?, segments.as_str())?,
            restaurants: parse_restaurants(&read(restaurants)?, restaurants.as_str())?,
        };
        info!(
            "loaded {} route segments from {segments} and {} restaurants from {restaurants}",
            dataset.segments.len(),
            dataset.restaurants.len()
        );
        Ok(dataset)
    }
}

fn read(path: &Utf8Path) -> Result<String, DatasetError> {
    read_utf8(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Open (creating if needed) the database at `db_path` and replace its
/// segments and restaurants with `dataset`.
///
/// Replacing the segments also clears the road graph and the catalogue,
/// since both are derived from them.
///
/// # Errors
/// Returns [`SeedError`] when the parent directory cannot be created or the
/// database cannot be written.
pub fn seed_database(db_path: &Utf8Path, dataset: &Dataset) -> Result<SqliteStore, SeedError> {
    ensure_parent_dir(db_path).map_err(|source| SeedError::CreateParent {
        path: db_path.to_path_buf(),
        source,
    })?;
    let store_error = |source| SeedError::Store {
        path: db_path.to_path_buf(),
        source,
    };
    let mut store = SqliteStore::open(db_path.as_std_path()).map_err(store_error)?;
    store
        .replace_segments(&dataset.segments)
        .map_err(store_error)?;
    store
        .replace_restaurants(&dataset.restaurants)
        .map_err(store_error)?;
    info!(
        "seeded {db_path} with {} route segments and {} restaurants",
        dataset.segments.len(),
        dataset.restaurants.len()
    );
    Ok(store)
}

/// Load the GeoJSON files and seed the database in one step.
///
/// # Errors
/// Returns [`SeedError`] when loading or seeding fails.
pub fn seed_from_files(
    db_path: &Utf8Path,
    segments: &Utf8Path,
    restaurants: &Utf8Path,
) -> Result<SqliteStore, SeedError> {
    let dataset = Dataset::load(segments, restaurants)?;
    seed_database(db_path, &dataset)
}
