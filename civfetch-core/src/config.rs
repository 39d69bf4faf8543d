//! Configuration system for civfetch.
//!
//! Uses `figment` for layered configuration: defaults -> config files -> environment.
//! Configuration is loaded from `~/.config/civfetch/config.toml` and/or `.civfetch/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::batch::PairingMode;
use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// How the external downloader is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Downloader executable, looked up on `PATH` when not absolute.
    pub program: String,
    /// Connections per server (`--max-connection-per-server`).
    pub max_connections: u32,
    /// Number of splits per file (`--split`).
    pub split: u32,
    /// Minimum split size (`--min-split-size`), aria2 size syntax.
    pub min_split_size: String,
    /// Seconds between progress summaries (`--summary-interval`).
    pub summary_interval_secs: u32,
    /// Console log level (`--console-log-level`).
    pub console_log_level: String,
    /// Continue partially downloaded files (`--continue`).
    pub resume: bool,
    /// Extra arguments inserted before the URL.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: "aria2c".to_string(),
            max_connections: 16,
            split: 16,
            min_split_size: "1M".to_string(),
            summary_interval_secs: 1,
            console_log_level: "error".to_string(),
            resume: true,
            extra_args: Vec::new(),
        }
    }
}

/// Remote catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog root, without trailing slash.
    pub base_url: String,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    #[serde(default = "default_true")]
    pub use_system_proxy: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://civitai.com".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("civfetch/{}", env!("CARGO_PKG_VERSION")),
            use_system_proxy: true,
        }
    }
}

/// Batch and session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Reject pair files with a dangling directory line instead of dropping it.
    pub strict_pairs: bool,
    /// Destination for catalog downloads when none is given on the command line.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            strict_pairs: false,
            output_dir: PathBuf::from("models"),
        }
    }
}

impl BatchConfig {
    pub fn pairing_mode(&self) -> PairingMode {
        if self.strict_pairs {
            PairingMode::Strict
        } else {
            PairingMode::Lenient
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "civfetch", "civfetch")
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".civfetch").join("config.toml")
}

/// Directory for rolling log files.
pub fn log_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `CIVFETCH_`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.civfetch/config.toml`)
/// 4. User config (`~/.config/civfetch/config.toml`)
/// 5. Built-in defaults
///
/// Command-line flags are applied by the caller on the returned value.
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<FetchConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(FetchConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // CIVFETCH_DOWNLOADER__PROGRAM, CIVFETCH_CATALOG__BASE_URL, etc.
    figment = figment.merge(Env::prefixed("CIVFETCH_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Check whether a user-level or workspace-level config file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = project_dirs() {
        if dirs.config_dir().join("config.toml").exists() {
            return true;
        }
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}
