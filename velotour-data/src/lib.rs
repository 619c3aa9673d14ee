//! Dataset input for the Velotour engine.
//!
//! Responsibilities:
//! - Read route segments and restaurants from GeoJSON feature collections.
//! - Seed a [`SqliteStore`](velotour_core::SqliteStore) with a loaded
//!   dataset, creating the database file and its parent directories.
//!
//! Boundaries:
//! - Do not encode pipeline rules (live in `velotour-catalog`).
//! - File access goes through `cap-std` with UTF-8 `camino` paths.

#![forbid(unsafe_code)]

mod error;
mod fs;
mod geojson;
mod seed;

pub use error::{DatasetError, SeedError};
pub use fs::{ensure_parent_dir, file_is_file, read_utf8, write_utf8};
pub use geojson::{LENGTH_PROPERTY, parse_restaurants, parse_segments};
pub use seed::{Dataset, seed_database, seed_from_files};
