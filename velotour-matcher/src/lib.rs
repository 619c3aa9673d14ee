//! Online matching of ride requests against the path catalogue.
//!
//! [`RuntimeMatcher`] answers the two questions a cyclist asks:
//! - **Where should I start?** [`RuntimeMatcher::select_starting_point`]
//!   draws a random starting point among catalogued paths of roughly the
//!   requested length, avoiding points recently handed out for the same
//!   request.
//! - **Which way do I ride?** [`RuntimeMatcher::select_path`] returns the
//!   first path from that starting point satisfying the length, restaurant
//!   types and number of stops, as a GeoJSON feature collection.
//!
//! The [`wire`] module holds the request and response bodies of the HTTP
//! contract; [`MatchError::status_code`] maps failures onto it.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;
mod config;
mod error;
mod matcher;
pub mod wire;

pub use cache::{CacheRecord, RequestSignature, StartingPointCache};
pub use config::{
    CacheConfig, DEFAULT_MAX_LENGTH_M, DEFAULT_MIN_STOPS, DEFAULT_SAMPLE_SIZE, MatcherConfig,
};
pub use error::{MatchError, ValidationError};
pub use matcher::RuntimeMatcher;
pub use wire::{
    Feature, FeatureCollection, FeatureProperties, GeoPoint, Geometry, PathRequest,
    StartingPointRequest, StartingPointResponse,
};
