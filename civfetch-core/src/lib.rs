//! # civfetch Core
//!
//! Core library for civfetch.
//! Resolves catalog model versions into download targets, derives
//! destination filenames from URLs, and drives an external multi-connection
//! downloader one target at a time while reporting its progress.

pub mod batch;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod filename;
pub mod outcome;
pub mod progress;
pub mod session;
pub mod types;

// Re-export commonly used types at the crate root.
pub use batch::{BatchDriver, BatchEntry, BatchReport, EntryStatus, PairingMode};
pub use catalog::{Catalog, CatalogClient};
pub use config::{FetchConfig, load_config};
pub use downloader::{DownloadObserver, Downloader, NoOpObserver, Transfer};
pub use error::{CivfetchError, Result};
pub use filename::resolve_filename;
pub use outcome::DownloadOutcome;
pub use session::{ManualDownload, SelectionSession, download_url};
pub use types::{DownloadProgress, DownloadResult, DownloadTarget, ModelInfo, OutputLine};
