//! Tunables for the offline pipeline stages.

use velotour_core::{HopPolicy, MatchTolerance};

use crate::PipelineError;

/// Default radius within which restaurants are linked to segment endpoints.
pub const DEFAULT_LINK_RADIUS_M: f64 = 1_000.0;

/// Default number of grid cells per axis when sampling starting points.
pub const DEFAULT_GRID_RESOLUTION: u32 = 20;

/// Default number of items between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 500;

/// Configuration for [`link_restaurants`](crate::link_restaurants).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkerConfig {
    /// Linking radius around each segment endpoint, in metres.
    pub radius_m: f64,
    /// Segments processed between progress log lines.
    pub progress_interval: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_LINK_RADIUS_M,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Fraction of a step by which a generated target may overshoot `max` and
/// still count as landing on it.
const RANGE_SLACK: f64 = 1e-9;

/// Target distances the catalogue is built for.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetDistances {
    /// Explicit targets in metres.
    List(Vec<f64>),
    /// `min` plus every multiple of `step` not exceeding `max`; `max` itself
    /// is included only when it lies on that grid.
    Range {
        /// Smallest target in metres.
        min: f64,
        /// Largest target in metres.
        max: f64,
        /// Increment between targets in metres.
        step: f64,
    },
}

impl Default for TargetDistances {
    fn default() -> Self {
        Self::List(vec![5_000.0, 7_500.0, 10_000.0])
    }
}

impl TargetDistances {
    /// Expand into the concrete list of targets.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidTargetRange`] when a range has a
    /// non-positive step, non-finite bounds or `min > max`.
    ///
    /// # Examples
    /// ```
    /// use velotour_catalog::TargetDistances;
    ///
    /// let targets = TargetDistances::Range { min: 200.0, max: 500.0, step: 100.0 };
    /// assert_eq!(targets.resolve().unwrap(), vec![200.0, 300.0, 400.0, 500.0]);
    /// ```
    #[expect(
        clippy::float_arithmetic,
        reason = "targets are generated by stepping through a distance range"
    )]
    pub fn resolve(&self) -> Result<Vec<f64>, PipelineError> {
        match self {
            Self::List(targets) => Ok(targets.clone()),
            Self::Range { min, max, step } => {
                let (min, max, step) = (*min, *max, *step);
                if !(min.is_finite() && max.is_finite() && step.is_finite())
                    || step <= 0.0
                    || min > max
                {
                    return Err(PipelineError::InvalidTargetRange { min, max, step });
                }
                let mut targets = Vec::new();
                let mut index = 0_u32;
                loop {
                    let target = min + f64::from(index) * step;
                    // Slack for rounding only; a partial last step is not a target.
                    if target > max + step * RANGE_SLACK {
                        break;
                    }
                    targets.push(target.min(max));
                    index += 1;
                }
                Ok(targets)
            }
        }
    }
}

/// Configuration for the catalog builder and the route resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    /// Grid cells per axis over the restaurant bounding box.
    pub grid_resolution: u32,
    /// Distances the catalogue is built for.
    pub targets: TargetDistances,
    /// Band applied around every target.
    pub tolerance: MatchTolerance,
    /// Edge budget for graph walks.
    pub hops: HopPolicy,
    /// Truncate an existing catalogue instead of leaving it untouched.
    pub rebuild: bool,
    /// Collapse starting points that landed on the same node.
    pub dedupe_starting_points: bool,
    /// Starting points processed between progress log lines.
    pub progress_interval: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            targets: TargetDistances::default(),
            tolerance: MatchTolerance::default(),
            hops: HopPolicy::default(),
            rebuild: false,
            dedupe_starting_points: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}
