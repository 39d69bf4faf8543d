//! Core data types shared by the resolver, downloader, catalog, and batch driver.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filename::resolve_filename;
use crate::outcome::DownloadOutcome;

/// One file to transfer: where it comes from, where it lands, and its name.
///
/// Only built through the constructors so the filename is always sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTarget {
    url: String,
    destination_directory: PathBuf,
    filename: String,
}

impl DownloadTarget {
    /// Build a target with an explicit filename.
    ///
    /// Path separators in `filename` are replaced with `_` so the file always
    /// lands directly inside `destination_directory`.
    pub fn new(
        url: impl Into<String>,
        destination_directory: impl Into<PathBuf>,
        filename: impl AsRef<str>,
    ) -> Self {
        Self {
            url: url.into(),
            destination_directory: destination_directory.into(),
            filename: sanitize_filename(filename.as_ref()),
        }
    }

    /// Build a target whose filename is derived from the URL.
    pub fn from_url(url: impl Into<String>, destination_directory: impl Into<PathBuf>) -> Self {
        let url = url.into();
        let filename = resolve_filename(&url);
        Self::new(url, destination_directory, filename)
    }

    /// Build a target for a resolved catalog entry.
    pub fn from_model(model: &ModelInfo, destination_directory: impl Into<PathBuf>) -> Self {
        Self::new(
            model.download_url.clone(),
            destination_directory,
            &model.file_name,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn destination_directory(&self) -> &Path {
        &self.destination_directory
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Full path the downloader writes to.
    pub fn destination_path(&self) -> PathBuf {
        self.destination_directory.join(&self.filename)
    }
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => crate::filename::FALLBACK_FILENAME.to_string(),
        _ => cleaned,
    }
}

/// Download metadata for one catalog model version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: u64,
    pub display_name: String,
    pub file_name: String,
    pub download_url: String,
}

impl ModelInfo {
    /// Label shown in selection lists.
    pub fn label(&self) -> String {
        format!("{} {} (ID: {})", self.display_name, self.file_name, self.id)
    }
}

/// The result of one downloader invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Process exit code, `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub target: DownloadTarget,
}

impl DownloadResult {
    pub fn outcome(&self) -> DownloadOutcome {
        DownloadOutcome::from_exit_code(self.exit_code)
    }

    pub fn status_message(&self) -> String {
        self.outcome().status_message(self.target.filename())
    }
}

/// Which pipe an output line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A single line of downloader output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub text: String,
    pub stream: OutputStream,
}

/// A progress reading scraped from a downloader output line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadProgress {
    /// Completion percentage, 0 to 100.
    pub percent: u8,
    /// Bytes completed so far, as printed by the downloader (e.g. `12MiB`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<String>,
    /// Total size, as printed by the downloader (e.g. `1.2GiB`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    /// Current transfer speed (e.g. `5.1MiB`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// Estimated time remaining (e.g. `3m50s`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}
