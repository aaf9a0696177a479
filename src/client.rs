//! Remote media catalog access
//!
//! The resolver consumes catalog metadata through the `MetadataFetcher`
//! trait so transports can be swapped (and mocked in tests). The
//! production implementation is a thin REST client: one GET per
//! identifier, JSON body, camelCase field names.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::MediaServerConfig;
use crate::timecode::TimeValue;
use crate::uri::MediaUri;
use crate::{Error, Result};

const USER_AGENT: &str = "lectern-media/0.1.0 (https://github.com/lectern/lectern)";

/// One declared sample inside an asset's metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSampleMetadata {
    /// Sample id; entries without one get synthetic ids at construction
    #[serde(rename = "ref")]
    pub id: Option<String>,
    pub title: Option<String>,
    pub start_time: Option<TimeValue>,
    pub duration: Option<TimeValue>,
    pub end_time: Option<TimeValue>,
}

/// Raw asset metadata as served by the catalog.
///
/// `path` is the media file location relative to the configured media
/// URL segment. Unknown fields are kept in `extra`; the resolver scans
/// them for embedded identifiers during transitive expansion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssetMetadata {
    #[serde(rename = "ref")]
    pub reference: String,
    pub uuid: String,
    pub path: Option<String>,
    pub extension: Option<String>,
    pub title: Option<String>,
    pub multi_part_count: Option<u32>,
    #[serde(default)]
    pub has_preview: bool,
    #[serde(default)]
    pub has_waveform: bool,
    pub cover: Option<String>,
    pub start_time: Option<TimeValue>,
    pub duration: Option<TimeValue>,
    pub end_time: Option<TimeValue>,
    pub samples: Option<Vec<RawSampleMetadata>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawAssetMetadata {
    /// Whether the asset root declares timing for the whole file.
    pub(crate) fn has_root_timing(&self) -> bool {
        self.start_time.is_some() || self.duration.is_some() || self.end_time.is_some()
    }
}

/// Transport seam between the resolver and the catalog.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch raw metadata for one canonical identifier.
    ///
    /// Returns `Error::NotFound` for identifiers unknown to the catalog
    /// and `Error::UnsupportedScheme` for schemes it cannot resolve.
    async fn fetch_metadata(&self, uri: &MediaUri) -> Result<RawAssetMetadata>;
}

/// REST client for the media catalog.
pub struct RestMetadataClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RestMetadataClient {
    pub fn new(config: &MediaServerConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl MetadataFetcher for RestMetadataClient {
    async fn fetch_metadata(&self, uri: &MediaUri) -> Result<RawAssetMetadata> {
        if !uri.is_resolvable() {
            return Err(Error::UnsupportedScheme {
                uri: uri.raw().to_string(),
                scheme: uri.scheme().as_str().to_string(),
            });
        }

        let url = format!(
            "{}/query/{}/{}",
            self.base_url,
            uri.scheme(),
            uri.authority()
        );

        debug!(uri = %uri, url = %url, "Querying media catalog");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network {
                uri: uri.raw().to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(uri.without_fragment()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                uri: uri.raw().to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let metadata: RawAssetMetadata = response.json().await.map_err(|e| Error::Parse {
            uri: uri.raw().to_string(),
            message: e.to_string(),
        })?;

        debug!(
            uri = %uri,
            reference = %metadata.reference,
            "Retrieved asset metadata from catalog"
        );

        Ok(metadata)
    }
}
