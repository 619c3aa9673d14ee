//! Errors surfaced by the runtime matcher.

use thiserror::Error;
use velotour_core::{InvalidBand, StoreError};

/// A request was rejected before the catalogue was queried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The requested length was zero.
    #[error("field {{length}} must be a positive number of metres")]
    ZeroLength,
    /// The requested length exceeds the configured ceiling.
    #[error("field {{length}} is {length} m; rides are limited to {max} m")]
    LengthTooLong {
        /// Requested length in metres.
        length: u32,
        /// Configured ceiling in metres.
        max: f64,
    },
    /// A requested restaurant type is not part of the known vocabulary.
    #[error("field {{type}} contains unknown restaurant type {kind:?}")]
    UnknownType {
        /// Offending type.
        kind: String,
    },
    /// The starting point was not a GeoJSON `Point`.
    #[error("field {{startingPoint}} must be a Point, got {kind:?}")]
    NotAPoint {
        /// Geometry type supplied by the caller.
        kind: String,
    },
    /// The starting point coordinates were NaN or infinite.
    #[error("field {{startingPoint}} has non-finite coordinates")]
    NonFiniteCoordinates,
}

impl ValidationError {
    /// HTTP status for this rejection: 404 for values outside a bounded or
    /// enumerated set, 400 otherwise.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::LengthTooLong { .. } | Self::UnknownType { .. } => 404,
            Self::ZeroLength | Self::NotAPoint { .. } | Self::NonFiniteCoordinates => 400,
        }
    }
}

/// Errors returned by [`RuntimeMatcher`](crate::RuntimeMatcher).
#[derive(Debug, Error)]
pub enum MatchError {
    /// The request failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No catalogued path offers a starting point for the request.
    #[error(
        "no starting point offers a ride of about {length} m with these restaurant types; \
         adjust the request"
    )]
    NoStartingPoint {
        /// Requested length in metres.
        length: u32,
    },
    /// No catalogued path from the starting point satisfies the request.
    #[error(
        "no path of about {length} m from this starting point satisfies the request; \
         adjust the request"
    )]
    NoPath {
        /// Requested length in metres.
        length: u32,
    },
    /// The configured tolerance yields no valid band for the length.
    #[error("tolerance gives no valid band around {length} m")]
    Tolerance {
        /// Requested length in metres.
        length: u32,
        /// Band validation failure.
        #[source]
        source: InvalidBand,
    },
    /// Reading the catalogue failed.
    #[error("failed to {operation}")]
    Store {
        /// Description of the failed operation.
        operation: &'static str,
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
}

impl MatchError {
    /// HTTP status for the wire contract.
    ///
    /// # Examples
    /// ```
    /// use velotour_matcher::{MatchError, ValidationError};
    ///
    /// assert_eq!(MatchError::NoPath { length: 5_000 }.status_code(), 400);
    /// let unknown = ValidationError::UnknownType { kind: "sushi".into() };
    /// assert_eq!(MatchError::from(unknown).status_code(), 404);
    /// ```
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(err) => err.status_code(),
            Self::NoStartingPoint { .. } | Self::NoPath { .. } => 400,
            Self::Tolerance { .. } | Self::Store { .. } => 500,
        }
    }

    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { operation, source }
    }
}
