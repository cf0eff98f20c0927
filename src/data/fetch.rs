use crate::core::projection::Projection;
use crate::data::csv::{PointFormat, UnitCountFormat};
use crate::data::query::QueryDescriptor;
use crate::data::record::Record;
use crate::{MapError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;

/// Shared HTTP client with a custom User-Agent. Building the client once avoids the
/// cost of TLS and connection pool setup for every query.
pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("mapfinder/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Retrieves detail records for a bounding-box query.
///
/// Returned records must already be located in the display projection.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch_records(&self, query: &QueryDescriptor) -> Result<Vec<Record>>;
}

/// Retrieves the per-unit record counts shown in Aggregated mode
#[async_trait]
pub trait UnitCountFetcher: Send + Sync {
    async fn fetch_counts(&self, endpoint: &str) -> Result<Vec<(String, u64)>>;
}

/// Fetcher for CSV exports served over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    detail_format: PointFormat,
    count_format: UnitCountFormat,
    display_projection: Projection,
}

impl HttpFetcher {
    pub fn new(
        detail_format: PointFormat,
        count_format: UnitCountFormat,
        display_projection: Projection,
    ) -> Self {
        Self {
            detail_format,
            count_format,
            display_projection,
        }
    }

    pub fn from_config(config: &crate::core::config::FinderConfig) -> Self {
        Self::new(
            config.detail_format.clone(),
            config.count_format.clone(),
            config.display_projection,
        )
    }

    async fn get_text(url: reqwest::Url) -> Result<String> {
        log::debug!("GET {}", url);
        let response = HTTP_CLIENT.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(MapError::Fetch(format!("HTTP {} for {}", response.status(), url)));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl RecordFetcher for HttpFetcher {
    async fn fetch_records(&self, query: &QueryDescriptor) -> Result<Vec<Record>> {
        let body = Self::get_text(query.url()?).await?;
        let records = self.detail_format.decode(&body, self.display_projection)?;
        log::info!("fetched {} records for {:?}", records.len(), query.bounds.to_array());
        Ok(records)
    }
}

#[async_trait]
impl UnitCountFetcher for HttpFetcher {
    async fn fetch_counts(&self, endpoint: &str) -> Result<Vec<(String, u64)>> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| MapError::Fetch(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        let body = Self::get_text(url).await?;
        self.count_format.decode(&body)
    }
}
