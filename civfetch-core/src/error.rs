//! Error types for the civfetch core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering catalog lookups, downloader invocation, input files,
//! configuration, and selection sessions.

use std::path::PathBuf;

/// Top-level error type for the civfetch core library.
#[derive(Debug, thiserror::Error)]
pub enum CivfetchError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from catalog lookups.
///
/// These never escape [`crate::catalog::Catalog::fetch`]; they are logged there
/// and the entry is treated as absent.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {message}")]
    Request { message: String },

    #[error("Catalog returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Catalog response parse error: {message}")]
    Parse { message: String },

    #[error("Catalog entry {id} is missing field '{field}'")]
    MissingField { id: u64, field: &'static str },
}

/// Fatal errors from a single downloader invocation.
///
/// A nonzero downloader exit code is not an error; it is reported through
/// [`crate::types::DownloadResult`].
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Failed to create destination directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start downloader '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for downloader '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from reading pair files and id lists.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to read input file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line_number} has no paired URL: '{content}'")]
    UnpairedLine { line_number: usize, content: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from an interactive selection session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No entries selected")]
    NothingSelected,

    #[error("No catalog entries could be resolved")]
    EmptyCatalog,
}

/// A type alias for results using the top-level `CivfetchError`.
pub type Result<T> = std::result::Result<T, CivfetchError>;
