//! Selection sessions over resolved catalog entries.
//!
//! A session is created for one round of choosing and downloading and then
//! discarded. Surfaces render [`SelectionSession::labels`], collect indices
//! from the user, and hand them back to [`SelectionSession::download_selected`].

use std::path::{Path, PathBuf};
use tracing::info;

use crate::batch::{BatchDriver, BatchReport, PairingMode};
use crate::catalog::{Catalog, version_id_from_url};
use crate::downloader::{DownloadObserver, Transfer};
use crate::error::{DownloadError, SessionError};
use crate::outcome::DownloadOutcome;
use crate::types::{DownloadResult, DownloadTarget, ModelInfo};

/// Resolved catalog entries plus where to put them.
#[derive(Debug, Clone)]
pub struct SelectionSession {
    models: Vec<ModelInfo>,
    output_dir: PathBuf,
}

impl SelectionSession {
    pub fn new(models: Vec<ModelInfo>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            models,
            output_dir: output_dir.into(),
        }
    }

    /// Resolve `ids` through `catalog`, keeping only successful lookups.
    pub async fn load(
        catalog: &dyn Catalog,
        ids: &[u64],
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, SessionError> {
        let models = catalog.fetch_all(ids).await;
        info!(
            requested = ids.len(),
            resolved = models.len(),
            "Catalog entries loaded"
        );
        if models.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }
        Ok(Self::new(models, output_dir))
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// One display label per entry, in catalog order.
    pub fn labels(&self) -> Vec<String> {
        self.models.iter().map(ModelInfo::label).collect()
    }

    /// Entries at `indices`, in catalog order, ignoring out-of-range and
    /// repeated indices.
    pub fn select(&self, indices: &[usize]) -> Vec<&ModelInfo> {
        self.models
            .iter()
            .enumerate()
            .filter(|(i, _)| indices.contains(i))
            .map(|(_, model)| model)
            .collect()
    }

    /// Download the selected entries one after another.
    pub async fn download_selected<T: Transfer + ?Sized>(
        &self,
        indices: &[usize],
        transfer: &T,
        observer: &mut dyn DownloadObserver,
    ) -> Result<BatchReport, SessionError> {
        let selected = self.select(indices);
        if selected.is_empty() {
            return Err(SessionError::NothingSelected);
        }
        let targets: Vec<DownloadTarget> = selected
            .into_iter()
            .map(|model| DownloadTarget::from_model(model, &self.output_dir))
            .collect();
        let driver = BatchDriver::new(transfer, PairingMode::Lenient);
        Ok(driver.run_targets(&targets, observer).await)
    }
}

/// Result of a single-URL download, with a manual fallback link when the
/// downloader was refused authorization.
#[derive(Debug, Clone)]
pub struct ManualDownload {
    pub result: DownloadResult,
    pub page_url: Option<String>,
}

impl ManualDownload {
    pub fn outcome(&self) -> DownloadOutcome {
        self.result.outcome()
    }
}

/// Download one URL into `output_dir`.
///
/// `filename` overrides the name derived from the URL. On an
/// authorization failure the catalog page for the URL's model version is
/// looked up so the user can fetch the file from a browser.
pub async fn download_url<T: Transfer + ?Sized>(
    url: &str,
    output_dir: &Path,
    filename: Option<&str>,
    transfer: &T,
    catalog: &dyn Catalog,
    observer: &mut dyn DownloadObserver,
) -> Result<ManualDownload, DownloadError> {
    let target = match filename {
        Some(name) => DownloadTarget::new(url, output_dir, name),
        None => DownloadTarget::from_url(url, output_dir),
    };
    let result = transfer.transfer(&target, observer).await?;

    let page_url = if result.outcome() == DownloadOutcome::AuthorizationRequired {
        match version_id_from_url(url) {
            Some(version_id) => catalog.resolve_page_url(version_id).await,
            None => None,
        }
    } else {
        None
    };

    Ok(ManualDownload { result, page_url })
}
