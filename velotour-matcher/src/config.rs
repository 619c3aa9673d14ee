//! Tunables for the runtime matcher.

use velotour_core::MatchTolerance;

/// Longest ride, in metres, a request may ask for.
pub const DEFAULT_MAX_LENGTH_M: f64 = 10_000.0;

/// Qualifying restaurants a starting point needs when types are requested.
pub const DEFAULT_MIN_STOPS: usize = 10;

/// Candidates drawn from the catalogue before picking one at random.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Configuration for the starting-point dedupe cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Recent starting points remembered per request signature.
    pub window: usize,
    /// Distinct request signatures kept before the least recently used is
    /// evicted.
    pub max_signatures: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            window: 3,
            max_signatures: 1_024,
        }
    }
}

/// Configuration for [`RuntimeMatcher`](crate::RuntimeMatcher).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
    /// Band applied around every requested length.
    pub tolerance: MatchTolerance,
    /// Upper bound on requested lengths, in metres.
    pub max_length_m: f64,
    /// Qualifying restaurants required by `select_starting_point` when the
    /// request names restaurant types.
    pub min_stops: usize,
    /// Candidates considered by `select_starting_point`.
    pub sample_size: usize,
    /// Restaurants a type needs before it joins the known vocabulary.
    pub min_type_count: usize,
    /// Dedupe cache settings.
    pub cache: CacheConfig,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            tolerance: MatchTolerance::default(),
            max_length_m: DEFAULT_MAX_LENGTH_M,
            min_stops: DEFAULT_MIN_STOPS,
            sample_size: DEFAULT_SAMPLE_SIZE,
            min_type_count: 1,
            cache: CacheConfig::default(),
        }
    }
}
