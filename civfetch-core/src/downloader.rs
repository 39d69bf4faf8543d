//! External downloader invocation with streamed output and progress parsing.
//!
//! One invocation runs one `aria2c` process to completion. Its stdout and
//! stderr are merged into a single line stream that is handed to a
//! [`DownloadObserver`] as it arrives.

use async_trait::async_trait;
use std::process::Stdio;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::{debug, info, warn};

use crate::config::DownloaderConfig;
use crate::error::DownloadError;
use crate::progress::parse_progress;
use crate::types::{DownloadProgress, DownloadResult, DownloadTarget, OutputLine, OutputStream};

/// Receives events from a running download.
///
/// All hooks default to no-ops so surfaces only implement what they render.
pub trait DownloadObserver: Send {
    /// The downloader is about to start for `target`.
    fn on_start(&mut self, _target: &DownloadTarget) {}

    /// A line of downloader output arrived.
    fn on_output(&mut self, _line: &OutputLine) {}

    /// A line carried a progress percentage.
    fn on_progress(&mut self, _progress: &DownloadProgress) {}

    /// The downloader exited.
    fn on_finish(&mut self, _result: &DownloadResult) {}
}

/// An observer that ignores every event.
pub struct NoOpObserver;

impl DownloadObserver for NoOpObserver {}

/// Anything that can move one [`DownloadTarget`] onto disk.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer(
        &self,
        target: &DownloadTarget,
        observer: &mut dyn DownloadObserver,
    ) -> Result<DownloadResult, DownloadError>;
}

/// Runs the configured external downloader.
pub struct Downloader {
    config: DownloaderConfig,
}

impl Downloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Command-line arguments for `target`, excluding the program itself.
    pub fn build_args(&self, target: &DownloadTarget) -> Vec<String> {
        let cfg = &self.config;
        let mut args = vec![
            format!("--summary-interval={}", cfg.summary_interval_secs),
            format!("--console-log-level={}", cfg.console_log_level),
            format!("--continue={}", cfg.resume),
            format!("--max-connection-per-server={}", cfg.max_connections),
            format!("--split={}", cfg.split),
            format!("--min-split-size={}", cfg.min_split_size),
        ];
        args.extend(cfg.extra_args.iter().cloned());
        args.push(target.url().to_string());
        args.push(format!("--dir={}", target.destination_directory().display()));
        args.push(format!("--out={}", target.filename()));
        args
    }

    /// Download `target`, blocking the current task until the process exits.
    ///
    /// A nonzero exit code is returned in the result. Only a failure to create
    /// the destination directory or to start/wait on the process is an error.
    pub async fn invoke(
        &self,
        target: &DownloadTarget,
        observer: &mut dyn DownloadObserver,
    ) -> Result<DownloadResult, DownloadError> {
        let dir = target.destination_directory();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| DownloadError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let args = self.build_args(target);
        debug!(program = %self.config.program, ?args, "Starting downloader");
        info!(file = target.filename(), dir = %dir.display(), "Downloading");

        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DownloadError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        observer.on_start(target);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(pipe) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(pipe, OutputStream::Stdout, tx.clone())));
        }
        if let Some(pipe) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(pipe, OutputStream::Stderr, tx.clone())));
        }
        // The channel closes once both readers hit EOF.
        drop(tx);

        while let Some(line) = rx.recv().await {
            observer.on_output(&line);
            if let Some(progress) = parse_progress(&line.text) {
                observer.on_progress(&progress);
            }
        }
        for reader in readers {
            let _ = reader.await;
        }

        let status = child.wait().await.map_err(|source| DownloadError::Wait {
            program: self.config.program.clone(),
            source,
        })?;

        let result = DownloadResult {
            exit_code: status.code().unwrap_or(-1),
            target: target.clone(),
        };
        if result.exit_code == 0 {
            info!(file = target.filename(), "Download finished");
        } else {
            warn!(
                file = target.filename(),
                exit_code = result.exit_code,
                "Downloader exited with non-zero status"
            );
        }
        observer.on_finish(&result);
        Ok(result)
    }
}

#[async_trait]
impl Transfer for Downloader {
    async fn transfer(
        &self,
        target: &DownloadTarget,
        observer: &mut dyn DownloadObserver,
    ) -> Result<DownloadResult, DownloadError> {
        self.invoke(target, observer).await
    }
}

/// Read `pipe` to EOF, sending each non-empty line as soon as it ends.
///
/// Both `\n` and the bare `\r` aria2 uses to redraw its readout end a line.
/// Bytes that are not valid UTF-8 are replaced rather than ending the stream.
async fn forward_lines<R>(pipe: R, stream: OutputStream, tx: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin,
{
    let codec = AnyDelimiterCodec::new(b"\r\n".to_vec(), Vec::new());
    let mut frames = FramedRead::new(pipe, codec);
    while let Some(Ok(frame)) = frames.next().await {
        let text = String::from_utf8_lossy(&frame).trim_end().to_string();
        if text.is_empty() {
            continue;
        }
        if tx.send(OutputLine { text, stream }).is_err() {
            return;
        }
    }
}
