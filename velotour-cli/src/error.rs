//! Error types emitted by the Velotour CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use velotour_catalog::PipelineError;
use velotour_core::{SqliteStoreError, StoreError};
use velotour_data::SeedError;
use velotour_matcher::MatchError;

use crate::build::Stage;

/// Errors emitted by the Velotour CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Loading the GeoJSON dataset or writing it to SQLite failed.
    #[error(transparent)]
    Seed(#[from] SeedError),
    /// Opening the SQLite store failed.
    #[error("failed to open database {path:?}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: SqliteStoreError,
    },
    /// Loading or saving the road graph failed.
    #[error("failed to {operation}: {source}")]
    Graph {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
    /// Reading or recording catalogue settings failed.
    #[error("failed to {operation} in {path:?}: {source}")]
    CatalogSettings {
        operation: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: SqliteStoreError,
    },
    /// An offline pipeline stage failed.
    #[error("{stage} stage failed: {source}")]
    Pipeline {
        stage: Stage,
        #[source]
        source: PipelineError,
    },
    /// Summarising the dataset failed.
    #[error("failed to summarise the dataset: {0}")]
    Stats(#[source] PipelineError),
    /// Reading a request file failed.
    #[error("failed to read request at {path:?}: {source}")]
    ReadRequest {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Request JSON could not be decoded.
    #[error("failed to parse request JSON at {path:?}: {source}")]
    ParseRequest {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Reading the starting-point cache failed.
    #[error("failed to read starting-point cache at {path:?}: {source}")]
    ReadCache {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The starting-point cache could not be decoded.
    #[error("failed to parse starting-point cache at {path:?}: {source}")]
    ParseCache {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Writing the starting-point cache failed.
    #[error("failed to write starting-point cache to {path:?}: {source}")]
    WriteCache {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The matcher rejected the request.
    #[error("request rejected with status {status}: {source}")]
    Match {
        status: u16,
        #[source]
        source: MatchError,
    },
    /// Serializing a response failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

impl CliError {
    /// Build a closure wrapping a [`PipelineError`] raised by `stage`.
    pub(crate) fn pipeline(stage: Stage) -> impl FnOnce(PipelineError) -> Self {
        move |source| Self::Pipeline { stage, source }
    }

    /// Build a closure wrapping a graph [`StoreError`] with `operation` context.
    pub(crate) fn graph(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Graph { operation, source }
    }
}

impl From<MatchError> for CliError {
    fn from(source: MatchError) -> Self {
        Self::Match {
            status: source.status_code(),
            source,
        }
    }
}
