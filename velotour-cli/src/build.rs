//! Build command implementation for the Velotour CLI.
//!
//! Each stage reads what the previous one wrote to the database, so stages
//! can be run one at a time or all in order. Graph walks run over an
//! in-memory snapshot of the persisted road graph.

use std::fmt;
use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use velotour_catalog::{
    CatalogConfig, LinkerConfig, TargetDistances, build_catalog, build_road_graph,
    link_restaurants, resolve_path_restaurants, resolve_path_routes,
};
use velotour_core::{MatchTolerance, RoadGraph, SqliteStore};

use crate::{ARG_DB, CliError, db_or_default, open_store};

pub(crate) const ARG_TARGET_MIN: &str = "target-min";
pub(crate) const ARG_TARGET_MAX: &str = "target-max";
pub(crate) const ARG_TARGET_STEP: &str = "target-step";
pub(crate) const ENV_TARGET_MIN: &str = "VELOTOUR_CMDS_BUILD_TARGET_MIN";
pub(crate) const ENV_TARGET_MAX: &str = "VELOTOUR_CMDS_BUILD_TARGET_MAX";
pub(crate) const ENV_TARGET_STEP: &str = "VELOTOUR_CMDS_BUILD_TARGET_STEP";

/// Offline pipeline stage selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Add nodes and edges for every route segment.
    Graph,
    /// Link restaurants to nearby segment endpoints.
    Link,
    /// Discover candidate paths from sampled starting points.
    Catalog,
    /// Record the segment sequence of every path.
    Routes,
    /// Record the restaurants passed by every path.
    Restaurants,
    /// Every stage, in pipeline order.
    All,
}

impl Stage {
    const PIPELINE: [Self; 5] = [
        Self::Graph,
        Self::Link,
        Self::Catalog,
        Self::Routes,
        Self::Restaurants,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Link => "link",
            Self::Catalog => "catalog",
            Self::Routes => "routes",
            Self::Restaurants => "restaurants",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CLI arguments for the `build` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "build",
    long_about = "Run the offline pipeline over a seeded database: build the \
                 road graph, link restaurants to segments, populate the path \
                 catalogue, then resolve each path's routes and restaurants. \
                 Every stage only processes unfinished work, so an \
                 interrupted build can simply be rerun.",
    about = "Run the offline pipeline stages"
)]
#[ortho_config(prefix = "VELOTOUR")]
pub(crate) struct BuildArgs {
    /// SQLite database produced by `velotour seed` (default `velotour.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
    /// Stage to run (default `all`).
    #[arg(long, value_enum, value_name = "stage")]
    #[serde(default)]
    pub(crate) stage: Option<Stage>,
    /// Radius, in metres, for linking restaurants to segment endpoints.
    #[arg(long, value_name = "metres")]
    #[serde(default)]
    pub(crate) link_radius: Option<f64>,
    /// Grid cells per axis when sampling starting points.
    #[arg(long, value_name = "cells")]
    #[serde(default)]
    pub(crate) grid_resolution: Option<u32>,
    /// Comma-separated target distances in metres.
    #[arg(long, value_name = "metres", value_delimiter = ',')]
    #[serde(default)]
    pub(crate) targets: Option<Vec<f64>>,
    /// Smallest target of a generated range, in metres.
    #[arg(long = ARG_TARGET_MIN, value_name = "metres")]
    #[serde(default)]
    pub(crate) target_min: Option<f64>,
    /// Largest target of a generated range, in metres.
    #[arg(long = ARG_TARGET_MAX, value_name = "metres")]
    #[serde(default)]
    pub(crate) target_max: Option<f64>,
    /// Increment between generated targets, in metres.
    #[arg(long = ARG_TARGET_STEP, value_name = "metres")]
    #[serde(default)]
    pub(crate) target_step: Option<f64>,
    /// Accepted deviation from a target, as a fraction (default 0.1).
    #[arg(long, value_name = "ratio")]
    #[serde(default)]
    pub(crate) tolerance: Option<f64>,
    /// Upper bound on edges per graph walk.
    #[arg(long, value_name = "edges")]
    #[serde(default)]
    pub(crate) max_hops: Option<usize>,
    /// Drop an existing catalogue and build it again.
    #[arg(long)]
    #[serde(default)]
    pub(crate) rebuild: bool,
    /// Walk from each distinct starting node only once.
    #[arg(long)]
    #[serde(default)]
    pub(crate) dedupe_starting_points: bool,
    /// Items processed between progress log lines.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) progress_interval: Option<usize>,
}

impl BuildArgs {
    pub(crate) fn into_config(self) -> Result<BuildConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        BuildConfig::try_from(merged)
    }
}

/// Resolved `build` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BuildConfig {
    pub(crate) db: Utf8PathBuf,
    pub(crate) stage: Stage,
    pub(crate) linker: LinkerConfig,
    pub(crate) catalog: CatalogConfig,
}

impl TryFrom<BuildArgs> for BuildConfig {
    type Error = CliError;

    fn try_from(args: BuildArgs) -> Result<Self, Self::Error> {
        let targets = target_distances(&args)?;
        let mut linker = LinkerConfig::default();
        let mut catalog = CatalogConfig {
            targets,
            rebuild: args.rebuild,
            dedupe_starting_points: args.dedupe_starting_points,
            ..CatalogConfig::default()
        };
        if let Some(radius_m) = args.link_radius {
            linker.radius_m = radius_m;
        }
        if let Some(resolution) = args.grid_resolution {
            catalog.grid_resolution = resolution;
        }
        if let Some(ratio) = args.tolerance {
            catalog.tolerance = MatchTolerance::new(ratio);
        }
        if let Some(max_hops) = args.max_hops {
            catalog.hops.max_hops = max_hops;
        }
        if let Some(interval) = args.progress_interval {
            linker.progress_interval = interval;
            catalog.progress_interval = interval;
        }
        Ok(Self {
            db: db_or_default(args.db),
            stage: args.stage.unwrap_or(Stage::All),
            linker,
            catalog,
        })
    }
}

/// A generated range needs all three bounds; otherwise an explicit list or
/// the default targets apply.
fn target_distances(args: &BuildArgs) -> Result<TargetDistances, CliError> {
    match (args.target_min, args.target_max, args.target_step) {
        (None, None, None) => Ok(args
            .targets
            .clone()
            .map_or_else(TargetDistances::default, TargetDistances::List)),
        (Some(min), Some(max), Some(step)) => Ok(TargetDistances::Range { min, max, step }),
        (None, _, _) => Err(CliError::MissingArgument {
            field: ARG_TARGET_MIN,
            env: ENV_TARGET_MIN,
        }),
        (_, None, _) => Err(CliError::MissingArgument {
            field: ARG_TARGET_MAX,
            env: ENV_TARGET_MAX,
        }),
        (_, _, None) => Err(CliError::MissingArgument {
            field: ARG_TARGET_STEP,
            env: ENV_TARGET_STEP,
        }),
    }
}

pub(crate) fn run_build(args: BuildArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_build(&config, writer)
}

pub(crate) fn execute_build(config: &BuildConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let mut store = open_store(&config.db)?;
    run_stage(config.stage, &mut store, config, writer)
}

fn run_stage(
    stage: Stage,
    store: &mut SqliteStore,
    config: &BuildConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    if stage != Stage::All {
        info!("running the {stage} stage on {}", config.db);
    }
    let interval = config.catalog.progress_interval;
    match stage {
        Stage::Graph => {
            let mut graph = load_graph(store)?;
            let report =
                build_road_graph(&*store, &mut graph, interval).map_err(CliError::pipeline(stage))?;
            if report.nodes_created > 0 || report.edges_created > 0 {
                store
                    .save_graph(&graph)
                    .map_err(CliError::graph("save the road graph"))?;
            }
            writeln!(
                writer,
                "graph: {} segments read, {} skipped, {} nodes and {} edges created",
                report.segments_seen,
                report.skipped_segments,
                report.nodes_created,
                report.edges_created
            )
        }
        Stage::Link => {
            let report =
                link_restaurants(store, &config.linker).map_err(CliError::pipeline(stage))?;
            writeln!(
                writer,
                "link: {} segments linked to {} restaurants in total",
                report.segments_linked, report.links_written
            )
        }
        Stage::Catalog => {
            let graph = load_graph(store)?;
            let report =
                build_catalog(store, &graph, &config.catalog).map_err(CliError::pipeline(stage))?;
            record_tolerance(store, config, report.already_built)?;
            if report.already_built {
                writeln!(
                    writer,
                    "catalog: already built; pass --rebuild to start over"
                )
            } else {
                writeln!(
                    writer,
                    "catalog: {} paths from {} starting points over {} targets ({} skipped)",
                    report.paths_inserted,
                    report.starting_points,
                    report.bands,
                    report.skipped_starting_points
                )
            }
        }
        Stage::Routes => {
            let graph = load_graph(store)?;
            let report = resolve_path_routes(store, &graph, config.catalog.hops, interval)
                .map_err(CliError::pipeline(stage))?;
            writeln!(
                writer,
                "routes: {} paths resolved, {} left unresolved",
                report.resolved, report.unresolved
            )
        }
        Stage::Restaurants => {
            let report =
                resolve_path_restaurants(store, interval).map_err(CliError::pipeline(stage))?;
            writeln!(
                writer,
                "restaurants: {} paths resolved, {} unknown restaurant ids dropped",
                report.resolved,
                report.dropped_ids
            )
        }
        Stage::All => {
            for stage in Stage::PIPELINE {
                run_stage(stage, store, config, writer)?;
            }
            Ok(())
        }
    }
    .map_err(CliError::WriteOutput)
}

/// Queries read the recorded tolerance back, so a fresh catalogue stores the
/// one it was built with. An existing catalogue keeps its own.
fn record_tolerance(
    store: &mut SqliteStore,
    config: &BuildConfig,
    already_built: bool,
) -> Result<(), CliError> {
    let settings_error = |operation| {
        move |source| CliError::CatalogSettings {
            operation,
            path: config.db.clone(),
            source,
        }
    };
    let requested = config.catalog.tolerance;
    if !already_built {
        return store
            .set_catalog_tolerance(requested)
            .map_err(settings_error("record the catalogue tolerance"));
    }
    let recorded = store
        .catalog_tolerance()
        .map_err(settings_error("read the catalogue tolerance"))?;
    if let Some(recorded) = recorded.filter(|recorded| *recorded != requested) {
        warn!(
            "catalogue was built with tolerance {}; ignoring {} until it is rebuilt",
            recorded.ratio, requested.ratio
        );
    }
    Ok(())
}

fn load_graph(store: &SqliteStore) -> Result<RoadGraph, CliError> {
    RoadGraph::from_store(store).map_err(CliError::graph("load the road graph"))
}
