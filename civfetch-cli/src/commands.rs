//! CLI subcommand handlers.

use crate::observers::{EchoObserver, ProgressObserver};
use crate::{Commands, ConfigAction, interactive};
use civfetch_core::batch::load_model_ids;
use civfetch_core::config::workspace_config_path;
use civfetch_core::error::SessionError;
use civfetch_core::{
    BatchDriver, BatchReport, CatalogClient, DownloadOutcome, Downloader, EntryStatus,
    FetchConfig, PairingMode, SelectionSession, download_url, load_config,
};
use std::path::{Path, PathBuf};

/// Whether every requested target ended materially complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    Incomplete,
}

impl RunStatus {
    fn from_complete(complete: bool) -> Self {
        if complete {
            RunStatus::Complete
        } else {
            RunStatus::Incomplete
        }
    }
}

/// Global options shared by every subcommand.
pub struct Context {
    pub workspace: PathBuf,
    pub config_file: Option<PathBuf>,
    pub quiet: bool,
}

impl Context {
    fn load_config(&self) -> anyhow::Result<FetchConfig> {
        load_config(Some(&self.workspace), self.config_file.as_deref())
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// `output`, or the configured output directory relative to the workspace.
    fn output_dir(&self, config: &FetchConfig, output: Option<PathBuf>) -> PathBuf {
        output.unwrap_or_else(|| self.workspace.join(&config.batch.output_dir))
    }
}

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, ctx: &Context) -> anyhow::Result<RunStatus> {
    match command {
        Commands::Batch { file, strict } => handle_batch(&file, strict, ctx).await,
        Commands::Ids { file, output, all } => handle_ids(&file, output, all, ctx).await,
        Commands::Url { url, output, name } => handle_url(&url, output, name, ctx).await,
        Commands::Info { ids } => handle_info(&ids, ctx).await,
        Commands::Config { action } => {
            handle_config(action, ctx)?;
            Ok(RunStatus::Complete)
        }
    }
}

/// Print per-target failures that produced no downloader output, then the summary.
fn finish_report(report: &BatchReport) -> RunStatus {
    for entry in &report.entries {
        if matches!(entry.status, EntryStatus::SetupFailed(_)) {
            println!("{}", entry.status_message());
        }
    }
    println!("{}", report.summary());
    RunStatus::from_complete(report.all_complete())
}

async fn handle_batch(file: &Path, strict: bool, ctx: &Context) -> anyhow::Result<RunStatus> {
    let config = ctx.load_config()?;
    let mode = if strict {
        PairingMode::Strict
    } else {
        config.batch.pairing_mode()
    };

    let downloader = Downloader::new(config.downloader);
    let driver = BatchDriver::new(&downloader, mode);
    let mut observer = EchoObserver::stdout();
    let report = driver.run(file, &mut observer).await?;
    Ok(finish_report(&report))
}

async fn handle_ids(
    file: &Path,
    output: Option<PathBuf>,
    all: bool,
    ctx: &Context,
) -> anyhow::Result<RunStatus> {
    let config = ctx.load_config()?;
    let ids = load_model_ids(file)?;
    if ids.is_empty() {
        anyhow::bail!("No model version ids found in {}", file.display());
    }

    let output_dir = ctx.output_dir(&config, output);
    let catalog = CatalogClient::new(&config.catalog)?;
    let session = SelectionSession::load(&catalog, &ids, output_dir).await?;

    let indices: Vec<usize> = if all {
        (0..session.models().len()).collect()
    } else {
        interactive::choose_models(&session.labels())?
    };

    let downloader = Downloader::new(config.downloader);
    let mut observer = ProgressObserver::new(!ctx.quiet);
    match session
        .download_selected(&indices, &downloader, &mut observer)
        .await
    {
        Ok(report) => Ok(finish_report(&report)),
        Err(SessionError::NothingSelected) => {
            println!("No entries selected");
            Ok(RunStatus::Complete)
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_url(
    url: &str,
    output: Option<PathBuf>,
    name: Option<String>,
    ctx: &Context,
) -> anyhow::Result<RunStatus> {
    let config = ctx.load_config()?;
    let output_dir = ctx.output_dir(&config, output);
    let catalog = CatalogClient::new(&config.catalog)?;
    let downloader = Downloader::new(config.downloader);
    let mut observer = ProgressObserver::new(!ctx.quiet);

    let manual = download_url(
        url,
        &output_dir,
        name.as_deref(),
        &downloader,
        &catalog,
        &mut observer,
    )
    .await?;

    if manual.outcome() == DownloadOutcome::AuthorizationRequired {
        match &manual.page_url {
            Some(page_url) => interactive::offer_page(page_url)?,
            None => println!(
                "No catalog page could be found for this URL; sign in on the catalog website and download it there."
            ),
        }
    }
    Ok(RunStatus::from_complete(manual.outcome().is_complete()))
}

async fn handle_info(ids: &[u64], ctx: &Context) -> anyhow::Result<RunStatus> {
    let config = ctx.load_config()?;
    let catalog = CatalogClient::new(&config.catalog)?;

    let mut entries = Vec::with_capacity(ids.len());
    let mut complete = true;
    for &id in ids {
        match catalog.try_fetch(id).await {
            Ok(model) => entries.push(serde_json::to_value(&model)?),
            Err(e) => {
                complete = false;
                entries.push(serde_json::json!({ "id": id, "error": e.to_string() }));
            }
        }
    }
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(RunStatus::from_complete(complete))
}

fn handle_config(action: ConfigAction, ctx: &Context) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(&ctx.workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let toml_str = toml::to_string_pretty(&FetchConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = ctx.load_config()?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
