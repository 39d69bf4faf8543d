//! Terminal renderings of a running download.

use civfetch_core::types::OutputStream;
use civfetch_core::{DownloadObserver, DownloadProgress, DownloadResult, DownloadTarget, OutputLine};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;

/// Echoes raw downloader output, one line at a time, followed by a status
/// line per target.
pub struct EchoObserver<W: Write + Send> {
    out: W,
}

impl EchoObserver<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> EchoObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    // Write errors on the terminal are not worth failing a download over.
    fn emit(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }
}

impl<W: Write + Send> DownloadObserver for EchoObserver<W> {
    fn on_start(&mut self, target: &DownloadTarget) {
        let line = format!(
            "Downloading {} into {}",
            target.filename(),
            target.destination_directory().display()
        );
        self.emit(&line);
    }

    fn on_output(&mut self, line: &OutputLine) {
        if !line.text.trim().is_empty() {
            self.emit(&line.text);
        }
    }

    fn on_finish(&mut self, result: &DownloadResult) {
        self.emit(&result.status_message());
    }
}

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% | {msg}";

/// Renders each download as a 0-100 progress bar with a short description.
pub struct ProgressObserver {
    visible: bool,
    bar: Option<ProgressBar>,
    filename: String,
}

impl ProgressObserver {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            bar: None,
            filename: String::new(),
        }
    }

    fn new_bar(&self) -> ProgressBar {
        let bar = ProgressBar::new(100);
        if !self.visible {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar
    }

    /// Current bar position, if a download is in flight.
    pub fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(ProgressBar::position)
    }
}

/// Bar message for a progress reading.
pub fn describe(filename: &str, progress: &DownloadProgress) -> String {
    let mut parts = vec![filename.to_string()];
    if let (Some(done), Some(total)) = (&progress.completed, &progress.total) {
        parts.push(format!("{}/{}", done, total));
    }
    if let Some(speed) = &progress.speed {
        parts.push(format!("{}/s", speed));
    }
    if let Some(eta) = &progress.eta {
        parts.push(format!("ETA {}", eta));
    }
    parts.join("  ")
}

impl DownloadObserver for ProgressObserver {
    fn on_start(&mut self, target: &DownloadTarget) {
        self.filename = target.filename().to_string();
        let bar = self.new_bar();
        bar.set_message(self.filename.clone());
        self.bar = Some(bar);
    }

    fn on_output(&mut self, line: &OutputLine) {
        // Readouts drive the bar; only other stderr chatter is worth showing.
        if line.stream == OutputStream::Stderr && !line.text.trim().is_empty() {
            if let Some(bar) = &self.bar {
                bar.println(&line.text);
            }
        }
    }

    fn on_progress(&mut self, progress: &DownloadProgress) {
        if let Some(bar) = &self.bar {
            bar.set_position(u64::from(progress.percent));
            bar.set_message(describe(&self.filename, progress));
        }
    }

    fn on_finish(&mut self, result: &DownloadResult) {
        if let Some(bar) = self.bar.take() {
            if result.outcome().is_complete() {
                bar.set_position(100);
            }
            bar.finish_and_clear();
        }
        println!("{}", result.status_message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn target() -> DownloadTarget {
        DownloadTarget::new("https://host/a.bin", "/models", "a.bin")
    }

    #[test]
    fn test_echo_observer_transcript() {
        let mut out = Vec::new();
        {
            let mut echo = EchoObserver::new(&mut out);
            echo.on_start(&target());
            echo.on_output(&OutputLine {
                text: "[#1 1MiB/2MiB(50%)]".into(),
                stream: OutputStream::Stdout,
            });
            echo.on_output(&OutputLine {
                text: "   ".into(),
                stream: OutputStream::Stdout,
            });
            echo.on_finish(&DownloadResult {
                exit_code: 0,
                target: target(),
            });
        }
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Downloading a.bin into /models\n[#1 1MiB/2MiB(50%)]\na.bin downloaded successfully.\n"
        );
    }

    #[test]
    fn test_progress_observer_tracks_percent() {
        let mut observer = ProgressObserver::new(false);
        assert_eq!(observer.position(), None);
        observer.on_start(&target());
        observer.on_progress(&DownloadProgress {
            percent: 42,
            ..Default::default()
        });
        assert_eq!(observer.position(), Some(42));
        observer.on_finish(&DownloadResult {
            exit_code: 0,
            target: target(),
        });
        assert_eq!(observer.position(), None);
    }

    #[test]
    fn test_describe_includes_available_fields() {
        let progress = DownloadProgress {
            percent: 10,
            completed: Some("120MiB".into()),
            total: Some("1.2GiB".into()),
            speed: Some("5.1MiB".into()),
            eta: Some("3m50s".into()),
        };
        assert_eq!(
            describe("model.safetensors", &progress),
            "model.safetensors  120MiB/1.2GiB  5.1MiB/s  ETA 3m50s"
        );
        assert_eq!(
            describe("model.safetensors", &DownloadProgress::default()),
            "model.safetensors"
        );
    }
}
