//! Downloader integration tests against a stub `aria2c` shell script.
//!
//! The stub records its arguments and invocation order next to the target
//! directory, prints aria2-style readouts, and picks its exit code from the
//! `--out` filename (`*fail*` 3, `*auth*` 24, `*partial*` 27, else 0).

#![cfg(unix)]

use async_trait::async_trait;
use civfetch_core::catalog::Catalog;
use civfetch_core::config::DownloaderConfig;
use civfetch_core::types::OutputStream;
use civfetch_core::{
    BatchDriver, DownloadObserver, DownloadOutcome, DownloadProgress, DownloadResult,
    DownloadTarget, Downloader, EntryStatus, ModelInfo, OutputLine, PairingMode,
    SelectionSession, download_url,
};
use pretty_assertions::assert_eq;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

const STUB_SCRIPT: &str = r#"#!/bin/sh
dir=""
out=""
for arg in "$@"; do
  case "$arg" in
    --dir=*) dir="${arg#--dir=}" ;;
    --out=*) out="${arg#--out=}" ;;
  esac
done
printf '%s\n' "$@" > "$dir/args.txt"
echo "$out" >> "$dir/../invocations.log"
case "$out" in
  *slow*)
    printf '[#a 1MiB/10MiB(10%%)]\r'
    sleep 2
    printf '[#a 10MiB/10MiB(100%%)]\n'
    exit 0 ;;
esac
echo "[#1a2b3c 0B/10MiB(0%) CN:1 DL:0B]"
printf '[#1a2b3c 5MiB/10MiB(50%%) CN:16 DL:5MiB ETA:1s]\r[#1a2b3c 10MiB/10MiB(100%%) CN:16 DL:5MiB]\n'
echo "warning from downloader" >&2
case "$out" in
  *fail*) exit 3 ;;
  *auth*) exit 24 ;;
  *partial*) exit 27 ;;
esac
exit 0
"#;

/// Records when each progress reading arrived.
struct Timeline {
    started: std::time::Instant,
    seen: Vec<(u8, std::time::Duration)>,
}

impl DownloadObserver for Timeline {
    fn on_progress(&mut self, progress: &DownloadProgress) {
        self.seen.push((progress.percent, self.started.elapsed()));
    }
}

/// Write the stub once, before any test in this binary spawns a process.
fn stub_program() -> &'static Path {
    static STUB: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
    let (_, path) = STUB.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aria2c-stub");
        std::fs::write(&path, STUB_SCRIPT).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    });
    path
}

fn stub_downloader() -> Downloader {
    Downloader::new(DownloaderConfig {
        program: stub_program().display().to_string(),
        ..Default::default()
    })
}

fn invocations(root: &Path) -> Vec<String> {
    std::fs::read_to_string(root.join("invocations.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[derive(Default)]
struct Recorder {
    started: Vec<String>,
    lines: Vec<OutputLine>,
    percents: Vec<u8>,
    last_progress: Option<DownloadProgress>,
    finished: Vec<i32>,
}

impl DownloadObserver for Recorder {
    fn on_start(&mut self, target: &DownloadTarget) {
        self.started.push(target.filename().to_string());
    }

    fn on_output(&mut self, line: &OutputLine) {
        self.lines.push(line.clone());
    }

    fn on_progress(&mut self, progress: &DownloadProgress) {
        self.percents.push(progress.percent);
        self.last_progress = Some(progress.clone());
    }

    fn on_finish(&mut self, result: &DownloadResult) {
        self.finished.push(result.exit_code);
    }
}

struct FakeCatalog;

#[async_trait]
impl Catalog for FakeCatalog {
    async fn fetch(&self, _id: u64) -> Option<ModelInfo> {
        None
    }

    async fn resolve_page_url(&self, version_id: u64) -> Option<String> {
        Some(format!(
            "https://catalog.test/models/77?modelVersionId={}",
            version_id
        ))
    }
}

#[tokio::test]
async fn test_invoke_streams_progress_and_exit_code() {
    let root = TempDir::new().unwrap();
    let downloader = stub_downloader();
    let target = DownloadTarget::new("https://host/file.bin", root.path().join("out"), "file.bin");
    let mut recorder = Recorder::default();

    let result = downloader.invoke(&target, &mut recorder).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.outcome(), DownloadOutcome::Success);
    assert_eq!(recorder.started, vec!["file.bin"]);
    assert_eq!(recorder.percents, vec![0, 50, 100]);
    assert_eq!(recorder.finished, vec![0]);
    let last = recorder.last_progress.unwrap();
    assert_eq!(last.total.as_deref(), Some("10MiB"));

    let stderr: Vec<&str> = recorder
        .lines
        .iter()
        .filter(|l| l.stream == OutputStream::Stderr)
        .map(|l| l.text.as_str())
        .collect();
    assert_eq!(stderr, vec!["warning from downloader"]);
}

#[tokio::test]
async fn test_carriage_return_readout_arrives_while_downloader_runs() {
    let root = TempDir::new().unwrap();
    let downloader = stub_downloader();
    let target = DownloadTarget::new("https://host/x", root.path().join("out"), "x-slow.bin");
    let mut timeline = Timeline {
        started: std::time::Instant::now(),
        seen: Vec::new(),
    };

    downloader.invoke(&target, &mut timeline).await.unwrap();

    let percents: Vec<u8> = timeline.seen.iter().map(|(p, _)| *p).collect();
    assert_eq!(percents, vec![10, 100]);
    let (_, at_10) = timeline.seen[0];
    let (_, at_100) = timeline.seen[1];
    assert!(
        at_100 - at_10 >= std::time::Duration::from_secs(1),
        "10% arrived at {:?}, 100% at {:?}",
        at_10,
        at_100
    );
}

#[tokio::test]
async fn test_invoke_passes_expected_arguments() {
    let root = TempDir::new().unwrap();
    let out_dir = root.path().join("out");
    let downloader = stub_downloader();
    let target = DownloadTarget::new("https://host/a b.bin", &out_dir, "a b.bin");

    downloader
        .invoke(&target, &mut civfetch_core::NoOpObserver)
        .await
        .unwrap();

    let args: Vec<String> = std::fs::read_to_string(out_dir.join("args.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(args, downloader.build_args(&target));
    assert!(args.contains(&format!("--dir={}", out_dir.display())));
    assert!(args.contains(&"--out=a b.bin".to_string()));
}

#[tokio::test]
async fn test_nonzero_exit_is_not_an_error() {
    let root = TempDir::new().unwrap();
    let downloader = stub_downloader();

    for (name, expected) in [
        ("x-fail.bin", DownloadOutcome::Failed(3)),
        ("x-auth.bin", DownloadOutcome::AuthorizationRequired),
        ("x-partial.bin", DownloadOutcome::PartialSuccess),
    ] {
        let target = DownloadTarget::new("https://host/x", root.path().join("out"), name);
        let result = downloader
            .invoke(&target, &mut civfetch_core::NoOpObserver)
            .await
            .unwrap();
        assert_eq!(result.outcome(), expected);
    }
}

#[tokio::test]
async fn test_batch_file_runs_every_pair_in_order() {
    let root = TempDir::new().unwrap();
    let a = root.path().join("a");
    let b = root.path().join("b");
    let source = root.path().join("pairs.txt");
    std::fs::write(
        &source,
        format!(
            "{a}\nhttps://host/first.bin\n\n{b}\nhttps://host/second-fail.bin\n{a}\nhttps://host/third.bin\n",
            a = a.display(),
            b = b.display()
        ),
    )
    .unwrap();

    let downloader = stub_downloader();
    let driver = BatchDriver::new(&downloader, PairingMode::Strict);
    let mut recorder = Recorder::default();
    let report = driver.run(&source, &mut recorder).await.unwrap();

    assert_eq!(
        invocations(root.path()),
        vec!["first.bin", "second-fail.bin", "third.bin"]
    );
    assert_eq!(recorder.finished, vec![0, 3, 0]);
    assert_eq!(report.entries.len(), 3);
    assert_eq!(
        report.entries[1].status,
        EntryStatus::Finished(DownloadOutcome::Failed(3))
    );
    assert_eq!(report.succeeded(), 2);
    assert!(a.join("args.txt").exists());
}

#[tokio::test]
async fn test_session_downloads_selection_with_catalog_filenames() {
    let root = TempDir::new().unwrap();
    let out = root.path().join("models");
    let models: Vec<ModelInfo> = (1..=3)
        .map(|id| ModelInfo {
            id,
            display_name: format!("v{}", id),
            file_name: format!("model-{}.safetensors", id),
            download_url: format!("https://civitai.com/api/download/models/{}", id),
        })
        .collect();
    let session = SelectionSession::new(models, &out);
    let downloader = stub_downloader();

    let report = session
        .download_selected(&[2, 0], &downloader, &mut civfetch_core::NoOpObserver)
        .await
        .unwrap();

    assert_eq!(report.entries.len(), 2);
    assert_eq!(
        invocations(root.path()),
        vec!["model-1.safetensors", "model-3.safetensors"]
    );
}

#[tokio::test]
async fn test_download_url_offers_page_on_authorization_failure() {
    let root = TempDir::new().unwrap();
    let out: PathBuf = root.path().join("out");
    let downloader = stub_downloader();

    let manual = download_url(
        "https://civitai.com/api/download/models/555",
        &out,
        Some("gated-auth.safetensors"),
        &downloader,
        &FakeCatalog,
        &mut civfetch_core::NoOpObserver,
    )
    .await
    .unwrap();

    assert_eq!(manual.outcome(), DownloadOutcome::AuthorizationRequired);
    assert_eq!(
        manual.page_url.as_deref(),
        Some("https://catalog.test/models/77?modelVersionId=555")
    );
}

#[tokio::test]
async fn test_download_url_success_has_no_page() {
    let root = TempDir::new().unwrap();
    let downloader = stub_downloader();

    let manual = download_url(
        "https://host/files/open%20model.ckpt",
        &root.path().join("out"),
        None,
        &downloader,
        &FakeCatalog,
        &mut civfetch_core::NoOpObserver,
    )
    .await
    .unwrap();

    assert_eq!(manual.outcome(), DownloadOutcome::Success);
    assert_eq!(manual.result.target.filename(), "open model.ckpt");
    assert_eq!(manual.page_url, None);
}
