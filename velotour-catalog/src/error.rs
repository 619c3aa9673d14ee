//! Error types raised by the offline catalog pipeline.

use thiserror::Error;
use velotour_core::{InvalidBand, NodeId, StoreError, TraversalError};

/// Errors raised while building the road graph or the path catalogue.
///
/// Every stage aborts on the first error; reruns pick up where the previous
/// run stopped because each stage only processes unfinished entities.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading from or writing to a store failed.
    #[error("failed to {operation}")]
    Store {
        /// Description of the failed operation.
        operation: &'static str,
        /// Source error from the store.
        #[source]
        source: StoreError,
    },
    /// Walking the road graph failed.
    #[error("failed to walk the road graph from {node}")]
    Traversal {
        /// Node the walk started from.
        node: NodeId,
        /// Source error from the traversal.
        #[source]
        source: TraversalError,
    },
    /// A target distance did not yield a valid tolerance band.
    #[error("target distance {target} m has no valid tolerance band")]
    InvalidTarget {
        /// Offending target in metres.
        target: f64,
        /// Band validation failure.
        #[source]
        source: InvalidBand,
    },
    /// A generated target range was malformed.
    #[error("invalid target range {min}..={max} step {step}")]
    InvalidTargetRange {
        /// Smallest target in metres.
        min: f64,
        /// Largest target in metres.
        max: f64,
        /// Increment between targets in metres.
        step: f64,
    },
    /// The linking radius was not a positive, finite distance.
    #[error("linking radius {radius_m} m must be positive and finite")]
    InvalidRadius {
        /// Offending radius in metres.
        radius_m: f64,
    },
    /// Starting points cannot be sampled without restaurants.
    #[error("cannot sample starting points: the store holds no restaurants")]
    NoRestaurants,
}

impl PipelineError {
    /// Build a closure wrapping a [`StoreError`] with `operation` context.
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { operation, source }
    }
}
