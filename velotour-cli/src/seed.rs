//! Seed command implementation for the Velotour CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use velotour_data::{Dataset, seed_database};

use crate::{ARG_DB, CliError, db_or_default, require_existing};

pub(crate) const ARG_SEGMENTS: &str = "segments";
pub(crate) const ARG_RESTAURANTS: &str = "restaurants";
pub(crate) const ENV_SEGMENTS: &str = "VELOTOUR_CMDS_SEED_SEGMENTS";
pub(crate) const ENV_RESTAURANTS: &str = "VELOTOUR_CMDS_SEED_RESTAURANTS";

/// CLI arguments for the `seed` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "seed",
    long_about = "Read route segments and restaurants from GeoJSON feature \
                 collections and write them into the SQLite database, \
                 replacing any previous dataset together with the road graph \
                 and the path catalogue derived from it.",
    about = "Load a GeoJSON dataset into a database"
)]
#[ortho_config(prefix = "VELOTOUR")]
pub(crate) struct SeedArgs {
    /// GeoJSON feature collection of cyclable route segments.
    #[arg(long = ARG_SEGMENTS, value_name = "path")]
    #[serde(default)]
    pub(crate) segments: Option<Utf8PathBuf>,
    /// GeoJSON feature collection of restaurants.
    #[arg(long = ARG_RESTAURANTS, value_name = "path")]
    #[serde(default)]
    pub(crate) restaurants: Option<Utf8PathBuf>,
    /// SQLite database to create or overwrite (default `velotour.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
}

impl SeedArgs {
    pub(crate) fn into_config(self) -> Result<SeedConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SeedConfig::try_from(merged)
    }
}

/// Resolved `seed` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedConfig {
    pub(crate) segments: Utf8PathBuf,
    pub(crate) restaurants: Utf8PathBuf,
    pub(crate) db: Utf8PathBuf,
}

impl SeedConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.segments, ARG_SEGMENTS)?;
        require_existing(&self.restaurants, ARG_RESTAURANTS)?;
        Ok(())
    }
}

impl TryFrom<SeedArgs> for SeedConfig {
    type Error = CliError;

    fn try_from(args: SeedArgs) -> Result<Self, Self::Error> {
        let segments = args.segments.ok_or(CliError::MissingArgument {
            field: ARG_SEGMENTS,
            env: ENV_SEGMENTS,
        })?;
        let restaurants = args.restaurants.ok_or(CliError::MissingArgument {
            field: ARG_RESTAURANTS,
            env: ENV_RESTAURANTS,
        })?;
        Ok(Self {
            segments,
            restaurants,
            db: db_or_default(args.db),
        })
    }
}

pub(crate) fn run_seed(args: SeedArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_seed(&config, writer)
}

pub(crate) fn execute_seed(config: &SeedConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    config.validate_sources()?;
    let dataset = Dataset::load(&config.segments, &config.restaurants)
        .map_err(velotour_data::SeedError::from)?;
    seed_database(&config.db, &dataset)?;
    info!("database {} is ready for `velotour build`", config.db);
    writeln!(
        writer,
        "seeded {} with {} route segments and {} restaurants",
        config.db,
        dataset.segments.len(),
        dataset.restaurants.len()
    )
    .map_err(CliError::WriteOutput)
}
