//! Sequential batch downloads from pair files and prebuilt target lists.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::downloader::{DownloadObserver, Transfer};
use crate::error::{InputError, Result};
use crate::outcome::DownloadOutcome;
use crate::types::DownloadTarget;

/// What to do with a trailing directory line that has no URL after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingMode {
    /// Log a warning and drop the dangling line.
    #[default]
    Lenient,
    /// Reject the whole file before downloading anything.
    Strict,
}

/// One `(destination_directory, url)` entry from a pair file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEntry {
    pub directory: PathBuf,
    pub url: String,
}

/// Parse pair-file content into ordered `(directory, url)` entries.
///
/// Lines are trimmed and blank lines ignored; the remaining lines pair up in
/// order.
pub fn parse_pairs(
    content: &str,
    mode: PairingMode,
) -> std::result::Result<Vec<PairEntry>, InputError> {
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let mut chunks = lines.chunks_exact(2);
    let entries = chunks
        .by_ref()
        .map(|pair| PairEntry {
            directory: PathBuf::from(pair[0].1),
            url: pair[1].1.to_string(),
        })
        .collect();

    if let [(line_number, content)] = chunks.remainder() {
        match mode {
            PairingMode::Strict => {
                return Err(InputError::UnpairedLine {
                    line_number: *line_number,
                    content: content.to_string(),
                });
            }
            PairingMode::Lenient => {
                warn!(
                    line_number,
                    content, "Ignoring trailing line with no paired URL"
                );
            }
        }
    }

    Ok(entries)
}

/// Parse an id list: one decimal id per line, anything else skipped.
pub fn parse_model_ids(content: &str) -> Vec<u64> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|line| line.parse().ok())
        .collect()
}

/// Read and parse an id list file.
pub fn load_model_ids(path: &Path) -> std::result::Result<Vec<u64>, InputError> {
    let content = read_input(path)?;
    Ok(parse_model_ids(&content))
}

fn read_input(path: &Path) -> std::result::Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// How a single batch entry ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// The downloader ran and exited.
    Finished(DownloadOutcome),
    /// The downloader could not be run for this target.
    SetupFailed(String),
}

/// One processed target in a batch.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub target: DownloadTarget,
    pub status: EntryStatus,
}

impl BatchEntry {
    /// Terminal status line for this entry.
    pub fn status_message(&self) -> String {
        match &self.status {
            EntryStatus::Finished(outcome) => outcome.status_message(self.target.filename()),
            EntryStatus::SetupFailed(reason) => {
                format!("{} could not be downloaded: {}", self.target.filename(), reason)
            }
        }
    }
}

/// Per-target results of a batch, in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&EntryStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Finished(DownloadOutcome::Success)))
    }

    pub fn partial(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Finished(DownloadOutcome::PartialSuccess)))
    }

    pub fn auth_required(&self) -> usize {
        self.count(|s| {
            matches!(
                s,
                EntryStatus::Finished(DownloadOutcome::AuthorizationRequired)
            )
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|s| {
            matches!(
                s,
                EntryStatus::Finished(DownloadOutcome::Failed(_)) | EntryStatus::SetupFailed(_)
            )
        })
    }

    /// Whether every target ended materially complete.
    pub fn all_complete(&self) -> bool {
        self.entries
            .iter()
            .all(|e| matches!(&e.status, EntryStatus::Finished(o) if o.is_complete()))
    }

    pub fn summary(&self) -> String {
        format!(
            "{} target(s): {} succeeded, {} partial, {} need authorization, {} failed",
            self.entries.len(),
            self.succeeded(),
            self.partial(),
            self.auth_required(),
            self.failed()
        )
    }
}

/// Drives a [`Transfer`] over a sequence of targets, one at a time.
pub struct BatchDriver<'a, T: Transfer + ?Sized> {
    transfer: &'a T,
    mode: PairingMode,
}

impl<'a, T: Transfer + ?Sized> BatchDriver<'a, T> {
    pub fn new(transfer: &'a T, mode: PairingMode) -> Self {
        Self { transfer, mode }
    }

    /// Download every `(directory, url)` pair listed in `source_file`.
    pub async fn run(
        &self,
        source_file: &Path,
        observer: &mut dyn DownloadObserver,
    ) -> Result<BatchReport> {
        let content = read_input(source_file)?;
        let pairs = parse_pairs(&content, self.mode)?;
        info!(
            file = %source_file.display(),
            count = pairs.len(),
            "Starting batch"
        );
        let targets: Vec<DownloadTarget> = pairs
            .into_iter()
            .map(|pair| DownloadTarget::from_url(pair.url, pair.directory))
            .collect();
        Ok(self.run_targets(&targets, observer).await)
    }

    /// Download prebuilt targets in order.
    ///
    /// A failed or unstartable target never stops the ones after it.
    pub async fn run_targets(
        &self,
        targets: &[DownloadTarget],
        observer: &mut dyn DownloadObserver,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for target in targets {
            let status = match self.transfer.transfer(target, observer).await {
                Ok(result) => EntryStatus::Finished(result.outcome()),
                Err(e) => {
                    warn!(file = target.filename(), error = %e, "Skipping target");
                    EntryStatus::SetupFailed(e.to_string())
                }
            };
            report.entries.push(BatchEntry {
                target: target.clone(),
                status,
            });
        }
        info!("{}", report.summary());
        report
    }
}
