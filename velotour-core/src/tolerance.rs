//! Distance bands and traversal budgets.

use thiserror::Error;

/// Error raised when a distance band is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid distance band [{min}, {max}]: bounds must be finite, non-negative and ordered")]
pub struct InvalidBand {
    /// Requested lower bound in metres.
    pub min: f64,
    /// Requested upper bound in metres.
    pub max: f64,
}

/// Inclusive range of acceptable path lengths, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBand {
    min: f64,
    max: f64,
}

impl DistanceBand {
    /// Validate and build a band.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBand`] when either bound is negative or not finite, or
    /// when `min > max`.
    pub fn new(min: f64, max: f64) -> Result<Self, InvalidBand> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(InvalidBand { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower bound in metres.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound in metres.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Whether `distance` lies within the band, bounds included.
    #[must_use]
    pub fn contains(&self, distance: f64) -> bool {
        self.min <= distance && distance <= self.max
    }
}

/// Relative tolerance applied around a requested distance.
///
/// The same ratio is used when cataloguing paths and when matching requests,
/// so a path catalogued for a target is always found when that target is
/// requested.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchTolerance {
    /// Fraction of the target accepted on either side, e.g. `0.1` for ±10 %.
    pub ratio: f64,
}

impl Default for MatchTolerance {
    fn default() -> Self {
        Self { ratio: 0.10 }
    }
}

impl MatchTolerance {
    /// Build a tolerance from a ratio.
    #[must_use]
    pub const fn new(ratio: f64) -> Self {
        Self { ratio }
    }

    /// Band `[target · (1 − ratio), target · (1 + ratio)]`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBand`] when the target or ratio yield an invalid band,
    /// for example a negative target or a ratio above one.
    ///
    /// # Examples
    /// ```
    /// use velotour_core::MatchTolerance;
    ///
    /// let band = MatchTolerance::default().band(5_000.0).unwrap();
    /// assert_eq!(band.min(), 4_500.0);
    /// assert_eq!(band.max(), 5_500.0);
    /// ```
    pub fn band(&self, target: f64) -> Result<DistanceBand, InvalidBand> {
        DistanceBand::new(target * (1.0 - self.ratio), target * (1.0 + self.ratio))
    }
}

/// How many edges a graph walk may take for a given target distance.
///
/// The budget scales with the target: `ceil(target / average_edge_length)`,
/// clamped to `[1, max_hops]`. Without a known average edge length the cap is
/// used directly.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HopPolicy {
    /// Upper bound on edges per walk.
    pub max_hops: usize,
    /// Mean edge distance in metres; measured from the graph when `None`.
    pub average_edge_length: Option<f64>,
}

/// Default cap on the number of edges a walk may take.
pub const DEFAULT_MAX_HOPS: usize = 10;

impl Default for HopPolicy {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            average_edge_length: None,
        }
    }
}

impl HopPolicy {
    /// Replace a missing average with `measured`.
    #[must_use]
    pub fn with_measured_average(self, measured: Option<f64>) -> Self {
        Self {
            average_edge_length: self.average_edge_length.or(measured),
            ..self
        }
    }

    /// Edge budget for a walk aiming at `target` metres.
    #[must_use]
    pub fn budget(&self, target: f64) -> usize {
        let cap = self.max_hops.max(1);
        match self.average_edge_length {
            Some(average) if average.is_finite() && average > 0.0 && target.is_finite() => {
                let hops = (target / average).ceil();
                if hops < 1.0 {
                    1
                } else if hops >= cap as f64 {
                    cap
                } else {
                    // Bounded by `cap` above, so the conversion cannot truncate.
                    hops as usize
                }
            }
            _ => cap,
        }
    }
}
