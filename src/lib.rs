//! # mapfinder
//!
//! Adaptive level-of-detail controller for finder-style map clients.
//!
//! Low zoom levels show an aggregated source (one symbol per aggregation unit with a
//! record count); high zoom levels show individual records fetched on demand for the
//! visible region. Regions that were already queried are remembered so the same area
//! is never fetched twice, and every fetch result is merged into one cumulative,
//! id-deduplicated store.

pub mod core;
pub mod data;
pub mod prelude;
pub mod spatial;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::{FailedFetchPolicy, FinderConfig},
    controller::{Collaborators, FetchOutcome, LodController},
    extent::Extent,
    geo::{LatLng, Point},
    projection::Projection,
};

pub use data::{
    fetch::{HttpFetcher, RecordFetcher, UnitCountFetcher},
    query::QueryDescriptor,
    record::{AggregationUnit, Record, RecordId},
    store::{merge, AggregatedStore, DetailedStore, Filter, FilterSet, SourceIdentity, SourceView},
};

pub use spatial::{
    extent_cache::ExtentFetchCache,
    lod::{decide, DisplayMode},
};

pub use ui::popup::{DismissGuard, SuppressiblePopup};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
