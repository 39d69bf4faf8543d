//! Interpretation of downloader exit codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit code aria2c uses when the server demanded authorization.
pub const EXIT_AUTHORIZATION_REQUIRED: i32 = 24;
/// Exit code treated as "completed with some non-fatal errors".
pub const EXIT_PARTIAL_SUCCESS: i32 = 27;

/// Classification of a finished downloader run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "exit_code")]
pub enum DownloadOutcome {
    Success,
    PartialSuccess,
    AuthorizationRequired,
    Failed(i32),
}

impl DownloadOutcome {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => DownloadOutcome::Success,
            EXIT_PARTIAL_SUCCESS => DownloadOutcome::PartialSuccess,
            EXIT_AUTHORIZATION_REQUIRED => DownloadOutcome::AuthorizationRequired,
            other => DownloadOutcome::Failed(other),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            DownloadOutcome::Success => 0,
            DownloadOutcome::PartialSuccess => EXIT_PARTIAL_SUCCESS,
            DownloadOutcome::AuthorizationRequired => EXIT_AUTHORIZATION_REQUIRED,
            DownloadOutcome::Failed(code) => *code,
        }
    }

    /// Whether the file is materially complete on disk.
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            DownloadOutcome::Success | DownloadOutcome::PartialSuccess
        )
    }

    /// Human-readable terminal status line for `filename`.
    pub fn status_message(&self, filename: &str) -> String {
        match self {
            DownloadOutcome::Success => format!("{} downloaded successfully.", filename),
            DownloadOutcome::PartialSuccess => format!(
                "{} completed with some errors (exit code {}).",
                filename, EXIT_PARTIAL_SUCCESS
            ),
            DownloadOutcome::AuthorizationRequired => format!(
                "{} requires authorization (exit code {}); download it from the catalog page in a browser.",
                filename, EXIT_AUTHORIZATION_REQUIRED
            ),
            DownloadOutcome::Failed(code) => match describe_exit_code(*code) {
                Some(reason) => format!(
                    "{} failed to download (exit code {}: {}).",
                    filename, code, reason
                ),
                None => format!("{} failed to download (exit code {}).", filename, code),
            },
        }
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Success => write!(f, "success"),
            DownloadOutcome::PartialSuccess => write!(f, "partial"),
            DownloadOutcome::AuthorizationRequired => write!(f, "auth-required"),
            DownloadOutcome::Failed(code) => write!(f, "failed({})", code),
        }
    }
}

/// Short reason for well-known aria2c exit codes.
pub fn describe_exit_code(code: i32) -> Option<&'static str> {
    let reason = match code {
        -1 => "terminated by signal",
        1 => "unknown error",
        2 => "timed out",
        3 => "resource not found",
        5 => "download speed too slow",
        6 => "network problem",
        7 => "unfinished downloads remained",
        8 => "server does not support resume",
        9 => "not enough disk space",
        13 => "file already exists",
        16 => "could not create file",
        17 => "file I/O error",
        18 => "could not create directory",
        19 => "name resolution failed",
        22 => "bad HTTP response header",
        23 => "too many redirects",
        28 => "bad downloader option",
        29 => "server overloaded",
        32 => "checksum validation failed",
        _ => return None,
    };
    Some(reason)
}
