//! civfetch CLI: batch, catalog-id, and single-URL model downloads through aria2c.

mod commands;
mod interactive;
mod observers;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::commands::{Context, RunStatus};

/// civfetch: fetch model files from a catalog with a multi-connection downloader
#[derive(Parser, Debug)]
#[command(name = "civfetch", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download every directory/URL pair listed in a file
    Batch {
        /// Pair file: a destination directory line followed by a URL line, repeated
        file: PathBuf,

        /// Reject a trailing directory line with no URL instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Resolve catalog model version ids, pick some, and download them
    Ids {
        /// File with one model version id per line
        file: PathBuf,

        /// Destination directory (defaults to `batch.output_dir`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Download every resolved entry without prompting
        #[arg(long)]
        all: bool,
    },
    /// Download a single URL
    Url {
        url: String,

        /// Destination directory (defaults to `batch.output_dir`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Filename to save as instead of the one derived from the URL
        #[arg(long)]
        name: Option<String>,
    },
    /// Print catalog metadata for model version ids as JSON
    Info {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default workspace configuration file
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = civfetch_core::config::log_dir();
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "civfetch.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let ctx = Context {
        workspace,
        config_file: cli.config,
        quiet: cli.quiet,
    };

    match commands::handle_command(cli.command, &ctx).await? {
        RunStatus::Complete => Ok(ExitCode::SUCCESS),
        RunStatus::Incomplete => Ok(ExitCode::FAILURE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch_with_global_flags() {
        let cli = Cli::try_parse_from(["civfetch", "-vv", "-c", "alt.toml", "batch", "pairs.txt", "--strict"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        match cli.command {
            Commands::Batch { file, strict } => {
                assert_eq!(file, PathBuf::from("pairs.txt"));
                assert!(strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_url_with_name() {
        let cli = Cli::try_parse_from([
            "civfetch",
            "url",
            "https://civitai.com/api/download/models/128713",
            "-o",
            "/models/checkpoints",
            "--name",
            "dreamshaper.safetensors",
        ])
        .unwrap();
        match cli.command {
            Commands::Url { url, output, name } => {
                assert!(url.ends_with("/128713"));
                assert_eq!(output, Some(PathBuf::from("/models/checkpoints")));
                assert_eq!(name.as_deref(), Some("dreamshaper.safetensors"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_info_requires_ids() {
        assert!(Cli::try_parse_from(["civfetch", "info"]).is_err());
        assert!(Cli::try_parse_from(["civfetch", "info", "abc"]).is_err());
    }
}
