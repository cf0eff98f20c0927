//! Configuration for the level-of-detail controller
//!
//! Everything the controller treats as a constant (cutoff zoom, query padding,
//! dataset endpoints, column names and projections) lives here so a host can load
//! it from JSON instead of recompiling.

use crate::core::{constants, projection::Projection};
use crate::data::csv::{PointFormat, UnitCountFormat};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What happens to a region's coverage entry when its fetch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedFetchPolicy {
    /// The region stays marked as fetched; panning back into it does not retry.
    #[default]
    KeepCoverage,
    /// The region's entry is dropped so the next visit queries it again.
    RetryOnNextVisit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    pub cluster_cutoff_zoom: f64,
    pub query_padding: f64,
    pub detail_zoom: f64,
    pub display_projection: Projection,
    pub detail_endpoint: String,
    pub unit_count_endpoint: String,
    pub detail_format: PointFormat,
    pub unit_format: PointFormat,
    pub unit_code_field: String,
    pub count_format: UnitCountFormat,
    pub failed_fetch_policy: FailedFetchPolicy,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            cluster_cutoff_zoom: constants::CLUSTER_CUTOFF_ZOOM,
            query_padding: constants::QUERY_PADDING,
            detail_zoom: constants::DETAIL_ZOOM,
            display_projection: Projection::WebMercator,
            detail_endpoint: constants::DETAIL_DATA_URL.to_string(),
            unit_count_endpoint: constants::UNIT_COUNT_URL.to_string(),
            detail_format: PointFormat {
                id: Some("id".to_string()),
                x: "x_coord".to_string(),
                y: "y_coord".to_string(),
                projection: Projection::NewYorkLongIsland,
            },
            unit_format: PointFormat {
                id: None,
                x: "x".to_string(),
                y: "y".to_string(),
                projection: Projection::NewYorkLongIsland,
            },
            unit_code_field: "community_board".to_string(),
            count_format: UnitCountFormat::default(),
            failed_fetch_policy: FailedFetchPolicy::default(),
        }
    }
}

impl FinderConfig {
    /// Parses a JSON document; missing keys fall back to the defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FinderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The projection detail queries are expressed in
    pub fn query_projection(&self) -> Projection {
        self.detail_format.projection
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cluster_cutoff_zoom.is_finite() {
            return Err(MapError::Config("cluster_cutoff_zoom must be finite".into()));
        }
        if !self.query_padding.is_finite() || self.query_padding < 0.0 {
            return Err(MapError::Config(format!(
                "query_padding must be a non-negative number, got {}",
                self.query_padding
            )));
        }
        if self.detail_endpoint.is_empty() {
            return Err(MapError::Config("detail_endpoint is empty".into()));
        }
        if self.unit_count_endpoint.is_empty() {
            return Err(MapError::Config("unit_count_endpoint is empty".into()));
        }
        if self.detail_format.id.is_none() {
            return Err(MapError::Config("detail_format needs an id column".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FinderConfig::default();
        assert_eq!(config.cluster_cutoff_zoom, 14.0);
        assert_eq!(config.query_padding, 500.0);
        assert_eq!(config.query_projection(), Projection::NewYorkLongIsland);
        assert_eq!(config.failed_fetch_policy, FailedFetchPolicy::KeepCoverage);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = FinderConfig::from_json_str(
            r#"{"cluster_cutoff_zoom": 12, "failed_fetch_policy": "retry_on_next_visit"}"#,
        )
        .unwrap();
        assert_eq!(config.cluster_cutoff_zoom, 12.0);
        assert_eq!(config.query_padding, 500.0);
        assert_eq!(config.failed_fetch_policy, FailedFetchPolicy::RetryOnNextVisit);
        assert_eq!(config.detail_format.x, "x_coord");
    }

    #[test]
    fn test_negative_padding_is_rejected() {
        let result = FinderConfig::from_json_str(r#"{"query_padding": -1}"#);
        assert!(matches!(result, Err(MapError::Config(_))));
    }

    #[test]
    fn test_malformed_json_is_a_serialization_error() {
        let result = FinderConfig::from_json_str("{not json");
        assert!(matches!(result, Err(MapError::Serialization(_))));
    }
}
