//! Progress extraction from downloader output.
//!
//! aria2c prints periodic readouts such as
//! `[#2089b0 12MiB/1.2GiB(1%) CN:16 DL:5.1MiB ETA:3m50s]`. Only the
//! parenthesized percentage is required; the remaining fields are picked up
//! when present.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::DownloadProgress;

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)%\)").expect("percent pattern is valid"));

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^\s\[/#]+)/([^\s(/]+)\(\d+%\)").expect("size pattern is valid")
});

static SPEED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DL:([^\s\]]+)").expect("speed pattern is valid"));

static ETA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ETA:([^\s\]]+)").expect("eta pattern is valid"));

/// Extract the first `(<digits>%)` marker from a line, clamped to 100.
pub fn parse_percent(line: &str) -> Option<u8> {
    let caps = PERCENT_RE.captures(line)?;
    // Digit runs too long for u32 are still valid markers; treat them as complete.
    let value = caps[1].parse::<u32>().unwrap_or(u32::MAX);
    Some(value.min(100) as u8)
}

/// Extract a full progress reading from a line, if it carries a percentage.
pub fn parse_progress(line: &str) -> Option<DownloadProgress> {
    let percent = parse_percent(line)?;
    let (completed, total) = SIZE_RE
        .captures(line)
        .map(|caps| (Some(caps[1].to_string()), Some(caps[2].to_string())))
        .unwrap_or((None, None));
    let capture = |re: &Regex| re.captures(line).map(|caps| caps[1].to_string());

    Some(DownloadProgress {
        percent,
        completed,
        total,
        speed: capture(&SPEED_RE),
        eta: capture(&ETA_RE),
    })
}
