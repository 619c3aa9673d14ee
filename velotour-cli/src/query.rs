//! Query commands answering ride requests from a built catalogue.
//!
//! Requests are read from JSON files holding the same bodies the HTTP
//! contract accepts; responses are printed as JSON.

use std::io::{ErrorKind, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::{debug, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use velotour_core::{MatchTolerance, SqliteStore};
use velotour_data::{ensure_parent_dir, file_is_file, read_utf8, write_utf8};
use velotour_matcher::{
    CacheRecord, MatcherConfig, PathRequest, RuntimeMatcher, StartingPointCache,
    StartingPointRequest,
};

use crate::{ARG_DB, CliError, db_or_default, open_store, require_existing, write_json};

pub(crate) const ARG_REQUEST: &str = "request";
pub(crate) const ENV_STARTING_POINT_REQUEST: &str = "VELOTOUR_CMDS_STARTING_POINT_REQUEST";
pub(crate) const ENV_PATH_REQUEST: &str = "VELOTOUR_CMDS_PATH_REQUEST";

/// CLI arguments for the `types` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "types", about = "List restaurant types, most common first")]
#[ortho_config(prefix = "VELOTOUR")]
pub(crate) struct TypesArgs {
    /// SQLite database holding the catalogue (default `velotour.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
    /// Restaurants a type needs before it is listed (default 1).
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) min_type_count: Option<usize>,
}

/// CLI arguments for the `starting-points` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "starting-points",
    about = "List every catalogued starting point as [longitude, latitude]"
)]
#[ortho_config(prefix = "VELOTOUR")]
pub(crate) struct StartingPointsArgs {
    /// SQLite database holding the catalogue (default `velotour.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
}

/// CLI arguments for the `starting-point` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "starting-point",
    long_about = "Pick a random starting point offering a ride of about the \
                 requested length past the requested restaurant types. The \
                 request file holds `{\"length\": 5000, \"type\": [..]}`. With \
                 --cache, the points recently returned for the same request \
                 are remembered between invocations and avoided.",
    about = "Recommend a starting point for a ride"
)]
#[ortho_config(prefix = "VELOTOUR")]
pub(crate) struct StartingPointArgs {
    /// Path to a JSON file containing the request body.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request: Option<Utf8PathBuf>,
    /// SQLite database holding the catalogue (default `velotour.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
    /// JSON file carrying recently returned starting points across runs.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) cache: Option<Utf8PathBuf>,
    /// Seed for the random draw, for reproducible answers.
    #[arg(long, value_name = "number")]
    #[serde(default)]
    pub(crate) seed: Option<u64>,
    /// Accepted deviation from the requested length, as a fraction; the
    /// tolerance recorded when the catalogue was built takes precedence.
    #[arg(long, value_name = "ratio")]
    #[serde(default)]
    pub(crate) tolerance: Option<f64>,
}

/// CLI arguments for the `path` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "path",
    long_about = "Describe the ride from a starting point as a GeoJSON \
                 feature collection: the restaurant stops followed by the \
                 route itself. The request file holds `{\"length\": 5000, \
                 \"startingPoint\": {..}, \"type\": [..], \"numberOfStops\": 3}`.",
    about = "Describe the ride from a starting point"
)]
#[ortho_config(prefix = "VELOTOUR")]
pub(crate) struct PathArgs {
    /// Path to a JSON file containing the request body.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request: Option<Utf8PathBuf>,
    /// SQLite database holding the catalogue (default `velotour.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
    /// Accepted deviation from the requested length, as a fraction; the
    /// tolerance recorded when the catalogue was built takes precedence.
    #[arg(long, value_name = "ratio")]
    #[serde(default)]
    pub(crate) tolerance: Option<f64>,
}

/// Resolved configuration shared by the query commands.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryConfig {
    pub(crate) request: Utf8PathBuf,
    pub(crate) db: Utf8PathBuf,
    pub(crate) cache: Option<Utf8PathBuf>,
    pub(crate) seed: Option<u64>,
    /// Tolerance named on the command line, if any.
    pub(crate) tolerance: Option<MatchTolerance>,
    pub(crate) matcher: MatcherConfig,
}

impl QueryConfig {
    fn new(
        request: Option<Utf8PathBuf>,
        env: &'static str,
        db: Option<Utf8PathBuf>,
        tolerance: Option<f64>,
    ) -> Result<Self, CliError> {
        let request = request.ok_or(CliError::MissingArgument {
            field: ARG_REQUEST,
            env,
        })?;
        Ok(Self {
            request,
            db: db_or_default(db),
            cache: None,
            seed: None,
            tolerance: tolerance.map(MatchTolerance::new),
            matcher: MatcherConfig::default(),
        })
    }
}

impl TryFrom<StartingPointArgs> for QueryConfig {
    type Error = CliError;

    fn try_from(args: StartingPointArgs) -> Result<Self, Self::Error> {
        let config = Self::new(
            args.request,
            ENV_STARTING_POINT_REQUEST,
            args.db,
            args.tolerance,
        )?;
        Ok(Self {
            cache: args.cache,
            seed: args.seed,
            ..config
        })
    }
}

impl TryFrom<PathArgs> for QueryConfig {
    type Error = CliError;

    fn try_from(args: PathArgs) -> Result<Self, Self::Error> {
        Self::new(args.request, ENV_PATH_REQUEST, args.db, args.tolerance)
    }
}

pub(crate) fn run_types(args: TypesArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let mut config = MatcherConfig::default();
    if let Some(count) = merged.min_type_count {
        config.min_type_count = count;
    }
    let store = open_store(&db_or_default(merged.db))?;
    let types = RuntimeMatcher::with_config(store, config).known_types()?;
    write_json(writer, &types)
}

pub(crate) fn run_starting_points(
    args: StartingPointsArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    execute_starting_points(&db_or_default(merged.db), writer)
}

pub(crate) fn execute_starting_points(
    db: &Utf8Path,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let points = RuntimeMatcher::new(open_store(db)?).starting_points()?;
    write_json(writer, &points)
}

pub(crate) fn run_starting_point(
    args: StartingPointArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    execute_starting_point(&QueryConfig::try_from(merged)?, writer)
}

pub(crate) fn execute_starting_point(
    config: &QueryConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let request: StartingPointRequest = load_request(&config.request)?;
    let mut matcher = open_matcher(config)?;
    if let Some(seed) = config.seed {
        matcher = matcher.with_seed(seed);
    }
    if let Some(cache) = &config.cache {
        restore_cache(matcher.cache(), cache)?;
    }
    let response = matcher.select_starting_point(&request)?;
    if let Some(cache) = &config.cache {
        save_cache(matcher.cache(), cache)?;
    }
    write_json(writer, &response)
}

pub(crate) fn run_path(args: PathArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    execute_path(&QueryConfig::try_from(merged)?, writer)
}

pub(crate) fn execute_path(config: &QueryConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let request: PathRequest = load_request(&config.request)?;
    let ride = open_matcher(config)?.select_path(&request)?;
    write_json(writer, &ride)
}

fn open_matcher(config: &QueryConfig) -> Result<RuntimeMatcher<SqliteStore>, CliError> {
    let store = open_store(&config.db)?;
    let recorded = store
        .catalog_tolerance()
        .map_err(|source| CliError::CatalogSettings {
            operation: "read the catalogue tolerance",
            path: config.db.clone(),
            source,
        })?;
    let tolerance = effective_tolerance(config.tolerance, recorded, config.matcher.tolerance);
    Ok(RuntimeMatcher::with_config(
        store,
        MatcherConfig {
            tolerance,
            ..config.matcher
        },
    ))
}

/// Requests are matched with the tolerance the catalogue was built with;
/// a requested one only applies to catalogues that never recorded theirs.
pub(crate) fn effective_tolerance(
    requested: Option<MatchTolerance>,
    recorded: Option<MatchTolerance>,
    fallback: MatchTolerance,
) -> MatchTolerance {
    match (requested, recorded) {
        (Some(requested), Some(recorded)) => {
            if requested != recorded {
                warn!(
                    "catalogue was built with tolerance {}; ignoring {}",
                    recorded.ratio, requested.ratio
                );
            }
            recorded
        }
        (None, Some(recorded)) => recorded,
        (Some(requested), None) => requested,
        (None, None) => fallback,
    }
}

/// Loads a JSON-encoded request body from disk.
pub(crate) fn load_request<T>(path: &Utf8Path) -> Result<T, CliError>
where
    T: DeserializeOwned,
{
    require_existing(path, ARG_REQUEST)?;
    let raw = read_utf8(path).map_err(|source| CliError::ReadRequest {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::ParseRequest {
        path: path.to_path_buf(),
        source,
    })
}

/// A missing cache file is an empty cache.
fn restore_cache(cache: &StartingPointCache, path: &Utf8Path) -> Result<(), CliError> {
    match file_is_file(path) {
        Ok(true) => {}
        Ok(false) => {
            return Err(CliError::SourcePathNotFile {
                field: "cache",
                path: path.to_path_buf(),
            });
        }
        Err(source) if source.kind() == ErrorKind::NotFound => {
            debug!("no starting-point cache at {path}; starting empty");
            return Ok(());
        }
        Err(source) => {
            return Err(CliError::ReadCache {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    let raw = read_utf8(path).map_err(|source| CliError::ReadCache {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<CacheRecord> =
        serde_json::from_str(&raw).map_err(|source| CliError::ParseCache {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("restored {} cached requests from {path}", records.len());
    cache.restore(records);
    Ok(())
}

fn save_cache(cache: &StartingPointCache, path: &Utf8Path) -> Result<(), CliError> {
    let payload =
        serde_json::to_string_pretty(&cache.snapshot()).map_err(CliError::SerializeResponse)?;
    let write_error = |source| CliError::WriteCache {
        path: path.to_path_buf(),
        source,
    };
    ensure_parent_dir(path).map_err(write_error)?;
    write_utf8(path, &payload).map_err(write_error)
}
