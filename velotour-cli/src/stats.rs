//! Stats command implementation for the Velotour CLI.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use velotour_catalog::{DatasetStats, dataset_stats};
use velotour_core::{GraphStore, PathStore};

use crate::{ARG_DB, CliError, db_or_default, open_store, write_json};

/// CLI arguments for the `stats` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "stats",
    about = "Summarise the dataset, road graph and catalogue in a database"
)]
#[ortho_config(prefix = "VELOTOUR")]
pub(crate) struct StatsArgs {
    /// SQLite database to inspect (default `velotour.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
}

/// Figures printed by `velotour stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StatsOutput {
    pub(crate) restaurants: usize,
    pub(crate) segments: usize,
    pub(crate) restaurants_per_type: Vec<TypeCount>,
    pub(crate) total_length_m: f64,
    pub(crate) nodes: usize,
    pub(crate) edges: usize,
    pub(crate) paths: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct TypeCount {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) count: usize,
}

pub(crate) fn run_stats(args: StatsArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let output = collect_stats(&db_or_default(merged.db))?;
    write_json(writer, &output)
}

pub(crate) fn collect_stats(db: &Utf8Path) -> Result<StatsOutput, CliError> {
    let store = open_store(db)?;
    let DatasetStats {
        restaurants,
        segments,
        per_type,
        total_length_m,
    } = dataset_stats(&store).map_err(CliError::Stats)?;
    let nodes = store
        .node_count()
        .map_err(CliError::graph("count road graph nodes"))?;
    let edges = store
        .edge_count()
        .map_err(CliError::graph("count road graph edges"))?;
    let paths = store
        .path_count()
        .map_err(CliError::graph("count catalogued paths"))?;
    Ok(StatsOutput {
        restaurants,
        segments,
        restaurants_per_type: per_type
            .into_iter()
            .map(|(kind, count)| TypeCount { kind, count })
            .collect(),
        total_length_m,
        nodes,
        edges,
        paths,
    })
}
