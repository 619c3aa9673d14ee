//! Test helpers for writing GeoJSON datasets and request files.

use super::*;
use crate::build::{BuildArgs, BuildConfig};
use crate::query::{PathArgs, QueryConfig, StartingPointArgs};
use crate::seed::{SeedArgs, SeedConfig};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;
use velotour_core::test_support::{grid_point, grid_segments};

/// Targets, in metres, matching two and three grid edges.
pub(super) const GRID_TARGETS: [f64; 2] = [2_224.0, 3_336.0];

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn db(&self) -> Utf8PathBuf {
        self.path("artefacts/velotour.db")
    }

    pub(super) fn write_json(&self, name: &str, value: &Value) -> Utf8PathBuf {
        let path = self.path(name);
        fs::write(&path, value.to_string()).expect("write JSON file");
        path
    }

    /// Four by four street grid with a restaurant on every corner.
    pub(super) fn write_grid_dataset(&self) -> (Utf8PathBuf, Utf8PathBuf) {
        let segments: Vec<Value> = grid_segments(4, 4)
            .iter()
            .map(|segment| {
                let coordinates: Vec<[f64; 2]> = segment
                    .geometry
                    .coords()
                    .map(|coord| [coord.x, coord.y])
                    .collect();
                json!({
                    "type": "Feature",
                    "geometry": { "type": "LineString", "coordinates": coordinates },
                    "properties": {}
                })
            })
            .collect();
        let restaurants: Vec<Value> = [
            (grid_point(0, 0), "pizzeria", "Chez Luigi"),
            (grid_point(3, 0), "bistro", "Bistro du Coin"),
            (grid_point(0, 3), "creperie", "Ti-Breizh"),
            (grid_point(3, 3), "pizzeria", "Pizzeria Ontario"),
        ]
        .iter()
        .map(|(location, kind, name)| {
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [location.x, location.y] },
                "properties": { "type": kind, "name": name }
            })
        })
        .collect();
        (
            self.write_json(
                "segments.geojson",
                &json!({ "type": "FeatureCollection", "features": segments }),
            ),
            self.write_json(
                "restaurants.geojson",
                &json!({ "type": "FeatureCollection", "features": restaurants }),
            ),
        )
    }

    pub(super) fn seed_config(&self) -> SeedConfig {
        let (segments, restaurants) = self.write_grid_dataset();
        SeedConfig::try_from(SeedArgs {
            segments: Some(segments),
            restaurants: Some(restaurants),
            db: Some(self.db()),
        })
        .expect("seed config")
    }

    pub(super) fn build_config(&self) -> BuildConfig {
        BuildConfig::try_from(BuildArgs {
            db: Some(self.db()),
            grid_resolution: Some(2),
            targets: Some(GRID_TARGETS.to_vec()),
            progress_interval: Some(10),
            ..BuildArgs::default()
        })
        .expect("build config")
    }

    /// Seed the grid dataset and run every pipeline stage over it.
    pub(super) fn prepare_catalogue(&self) {
        let mut sink = Vec::new();
        seed::execute_seed(&self.seed_config(), &mut sink).expect("seed");
        build::execute_build(&self.build_config(), &mut sink).expect("build");
    }

    pub(super) fn starting_point_config(
        &self,
        length: u32,
        cache: Option<Utf8PathBuf>,
        seed: u64,
    ) -> QueryConfig {
        let request = self.write_json(
            "starting-point.json",
            &json!({ "length": length, "type": [] }),
        );
        QueryConfig::try_from(StartingPointArgs {
            request: Some(request),
            db: Some(self.db()),
            cache,
            seed: Some(seed),
            tolerance: None,
        })
        .expect("starting-point config")
    }

    pub(super) fn path_config(&self, body: &Value) -> QueryConfig {
        let request = self.write_json("path.json", body);
        QueryConfig::try_from(PathArgs {
            request: Some(request),
            db: Some(self.db()),
            tolerance: None,
        })
        .expect("path config")
    }
}

/// Decode the JSON a command printed.
pub(super) fn printed_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("command prints JSON")
}

pub(super) fn printed_text(output: &[u8]) -> String {
    String::from_utf8(output.to_vec()).expect("command prints UTF-8")
}
