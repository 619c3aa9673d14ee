//! Summary figures about a loaded dataset.

use velotour_core::{RestaurantStore, SegmentStore, type_popularity};

use crate::PipelineError;

/// Size and composition of a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStats {
    /// Number of restaurants.
    pub restaurants: usize,
    /// Number of route segments.
    pub segments: usize,
    /// Restaurants per type, most common first.
    pub per_type: Vec<(String, usize)>,
    /// Sum of all segment lengths, in metres.
    pub total_length_m: f64,
}

/// Count restaurants and segments and sum the cyclable length.
///
/// # Errors
/// Returns [`PipelineError::Store`] when the store cannot be read.
pub fn dataset_stats<S>(store: &S) -> Result<DatasetStats, PipelineError>
where
    S: SegmentStore + RestaurantStore + ?Sized,
{
    let restaurants = store
        .restaurants()
        .map_err(PipelineError::store("read restaurants"))?;
    let segments = store
        .segments()
        .map_err(PipelineError::store("read route segments"))?;
    Ok(DatasetStats {
        restaurants: restaurants.len(),
        segments: segments.len(),
        per_type: type_popularity(&restaurants),
        total_length_m: segments.iter().map(|segment| segment.length).sum(),
    })
}
