//! Command-line interface for Velotour's offline pipeline and matcher.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;
use velotour_core::SqliteStore;

mod build;
mod error;
mod query;
mod seed;
mod stats;

pub use build::Stage;
pub use error::CliError;

use build::BuildArgs;
use query::{PathArgs, StartingPointArgs, StartingPointsArgs, TypesArgs};
use seed::SeedArgs;
use stats::StatsArgs;

pub(crate) const ARG_DB: &str = "db";
pub(crate) const DEFAULT_DB: &str = "velotour.db";

/// Run the Velotour CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.verbose);
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    // A logger installed by an embedding process wins.
    let _ = builder.target(env_logger::Target::Stderr).try_init();
}

fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Seed(args) => seed::run_seed(args, writer),
        Command::Build(args) => build::run_build(args, writer),
        Command::Stats(args) => stats::run_stats(args, writer),
        Command::Types(args) => query::run_types(args, writer),
        Command::StartingPoints(args) => query::run_starting_points(args, writer),
        Command::StartingPoint(args) => query::run_starting_point(args, writer),
        Command::Path(args) => query::run_path(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "velotour",
    about = "Build and query a catalogue of bicycle rides past restaurants",
    version
)]
struct Cli {
    /// Log debug output from every stage.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load route segments and restaurants from GeoJSON into a database.
    Seed(SeedArgs),
    /// Run the offline pipeline stages over a seeded database.
    Build(BuildArgs),
    /// Summarise the dataset held by a database.
    Stats(StatsArgs),
    /// List the restaurant types requests may name.
    Types(TypesArgs),
    /// List every catalogued starting point.
    StartingPoints(StartingPointsArgs),
    /// Recommend a starting point for a ride.
    StartingPoint(StartingPointArgs),
    /// Describe the ride from a starting point as GeoJSON.
    Path(PathArgs),
}

pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match velotour_data::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Open an existing database; commands other than `seed` never create one.
pub(crate) fn open_store(db: &Utf8Path) -> Result<SqliteStore, CliError> {
    require_existing(db, ARG_DB)?;
    SqliteStore::open(db.as_std_path()).map_err(|source| CliError::OpenStore {
        path: db.to_path_buf(),
        source,
    })
}

pub(crate) fn db_or_default(db: Option<Utf8PathBuf>) -> Utf8PathBuf {
    db.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DB))
}

pub(crate) fn write_json<T>(writer: &mut dyn Write, value: &T) -> Result<(), CliError>
where
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeResponse)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
