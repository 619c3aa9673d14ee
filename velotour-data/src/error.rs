//! Errors raised while loading and seeding datasets.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;
use velotour_core::SqliteStoreError;

/// Errors returned when reading a GeoJSON dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The file could not be read.
    #[error("failed to read dataset {path}")]
    Read {
        /// File that failed to open or read.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The content was not valid GeoJSON.
    #[error("failed to parse GeoJSON from {origin}")]
    Parse {
        /// File name or other description of the input.
        origin: String,
        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },
    /// A feature's coordinates were malformed.
    #[error("feature {index} of {origin} has invalid {geometry} coordinates")]
    InvalidCoordinates {
        /// File name or other description of the input.
        origin: String,
        /// Zero-based feature position in the collection.
        index: usize,
        /// Declared geometry type.
        geometry: String,
    },
}

/// Errors returned when seeding a SQLite database from a dataset.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Loading the dataset failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// The database's parent directory could not be created.
    #[error("failed to create parent directory for {path}")]
    CreateParent {
        /// Database path whose parent was being created.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Writing to the database failed.
    #[error("failed to seed {path}")]
    Store {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error from the store.
        #[source]
        source: SqliteStoreError,
    },
}
