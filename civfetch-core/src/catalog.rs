//! Catalog client: resolves model version ids into download metadata.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::types::ModelInfo;

/// Lookup interface over the remote catalog.
///
/// Failures are reported as `None`; implementations log the cause.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolve a model version id into download metadata.
    async fn fetch(&self, id: u64) -> Option<ModelInfo>;

    /// Browser page for a model version, for manual download.
    async fn resolve_page_url(&self, version_id: u64) -> Option<String>;

    /// Resolve each id in order, dropping those that fail.
    async fn fetch_all(&self, ids: &[u64]) -> Vec<ModelInfo> {
        let mut models = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(model) = self.fetch(id).await {
                models.push(model);
            }
        }
        models
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionResponse {
    name: Option<String>,
    model_id: Option<u64>,
    #[serde(default)]
    files: Vec<VersionFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionFile {
    name: Option<String>,
    download_url: Option<String>,
}

/// HTTP client for the catalog's model-version endpoint.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(|e| CatalogError::Request {
            message: format!("Failed to create HTTP client: {}", e),
        })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint URL for a model version.
    pub fn version_endpoint(&self, id: u64) -> String {
        format!("{}/api/v1/model-versions/{}", self.base_url, id)
    }

    /// Browser page for a model and one of its versions.
    pub fn page_url(&self, model_id: u64, version_id: u64) -> String {
        format!(
            "{}/models/{}?modelVersionId={}",
            self.base_url, model_id, version_id
        )
    }

    async fn get_version(&self, id: u64) -> Result<String, CatalogError> {
        let url = self.version_endpoint(id);
        debug!("Catalog lookup URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Request {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response.text().await.map_err(|e| CatalogError::Request {
            message: format!("Failed to read catalog response: {}", e),
        })
    }

    /// Resolve a version id, surfacing the failure cause.
    pub async fn try_fetch(&self, id: u64) -> Result<ModelInfo, CatalogError> {
        let body = self.get_version(id).await?;
        parse_model_info(id, &body)
    }

    /// Look up the parent model id of a version.
    pub async fn try_model_id(&self, version_id: u64) -> Result<u64, CatalogError> {
        let body = self.get_version(version_id).await?;
        let response = parse_version(&body)?;
        response.model_id.ok_or(CatalogError::MissingField {
            id: version_id,
            field: "modelId",
        })
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn fetch(&self, id: u64) -> Option<ModelInfo> {
        match self.try_fetch(id).await {
            Ok(model) => Some(model),
            Err(e) => {
                warn!(id, error = %e, "Failed to fetch catalog entry");
                None
            }
        }
    }

    async fn resolve_page_url(&self, version_id: u64) -> Option<String> {
        match self.try_model_id(version_id).await {
            Ok(model_id) => Some(self.page_url(model_id, version_id)),
            Err(e) => {
                warn!(version_id, error = %e, "Failed to resolve catalog page");
                None
            }
        }
    }
}

fn parse_version(body: &str) -> Result<VersionResponse, CatalogError> {
    serde_json::from_str(body).map_err(|e| CatalogError::Parse {
        message: e.to_string(),
    })
}

/// Extract download metadata from a model-version response body.
///
/// The first listed file is the one downloaded.
pub fn parse_model_info(id: u64, body: &str) -> Result<ModelInfo, CatalogError> {
    let response = parse_version(body)?;
    let missing = |field| CatalogError::MissingField { id, field };

    let display_name = response.name.ok_or_else(|| missing("name"))?;
    let file = response
        .files
        .into_iter()
        .next()
        .ok_or_else(|| missing("files"))?;
    let file_name = file
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| missing("files[0].name"))?;
    let download_url = file
        .download_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| missing("files[0].downloadUrl"))?;

    Ok(ModelInfo {
        id,
        display_name,
        file_name,
        download_url,
    })
}

/// Extract a model version id from a catalog URL.
///
/// Recognizes `/api/download/models/{id}` download links and a
/// `modelVersionId` query parameter.
pub fn version_id_from_url(url: &str) -> Option<u64> {
    let parsed = Url::parse(url).ok()?;

    if let Some(id) = parsed
        .query_pairs()
        .find(|(k, _)| k == "modelVersionId")
        .and_then(|(_, v)| v.parse().ok())
    {
        return Some(id);
    }

    let segments: Vec<&str> = parsed.path_segments()?.collect();
    segments
        .windows(4)
        .find(|w| w[0] == "api" && w[1] == "download" && w[2] == "models")
        .and_then(|w| w[3].parse().ok())
}
