//! Destination filename resolution for download URLs.
//!
//! Presigned storage URLs usually carry the real filename in a
//! `response-content-disposition` query parameter while the path ends in an
//! opaque object key, so the query is consulted before the path.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use url::Url;

/// Name used when neither the query nor the path yields a filename.
pub const FALLBACK_FILENAME: &str = "downloaded_file";

/// Query parameter names that carry a content-disposition value.
const DISPOSITION_PARAMS: &[&str] = &["response-content-disposition", "content-disposition"];

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename="?([^";]+)"?"#).expect("filename pattern is valid")
});

static FILENAME_EXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*=[^']*'[^']*'([^;"]+)"#).expect("filename* pattern is valid")
});

/// Derive a destination filename from a URL.
///
/// Order of preference: a disposition-style query parameter, the
/// percent-decoded last path segment, then [`FALLBACK_FILENAME`]. Never fails;
/// input that does not parse as a URL is split by hand.
pub fn resolve_filename(url: &str) -> String {
    if let Some(name) = filename_from_query(url) {
        return name;
    }
    let segment = last_path_segment(url);
    if segment.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        segment
    }
}

/// Extract the filename carried by a disposition-style query parameter.
pub fn filename_from_query(url: &str) -> Option<String> {
    query_pairs(url)
        .into_iter()
        .filter(|(key, _)| {
            DISPOSITION_PARAMS
                .iter()
                .any(|param| key.eq_ignore_ascii_case(param))
        })
        .find_map(|(_, value)| filename_from_disposition(&value))
}

/// Parse a content-disposition value such as `attachment; filename="a.bin"`.
///
/// An RFC 5987 `filename*=UTF-8''...` form wins over a plain `filename=`.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    if let Some(caps) = FILENAME_EXT_RE.captures(value) {
        let decoded = percent_decode(caps[1].trim());
        if !decoded.is_empty() {
            return Some(decoded);
        }
    }
    FILENAME_RE
        .captures(value)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

fn query_pairs(url: &str) -> Vec<(String, String)> {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        Err(_) => {
            let Some((_, query)) = strip_fragment(url).split_once('?') else {
                return Vec::new();
            };
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        }
    }
}

fn last_path_segment(url: &str) -> String {
    let raw: Cow<'_, str> = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string()
            .into(),
        Err(_) => {
            let without_query = strip_fragment(url)
                .split_once('?')
                .map_or(strip_fragment(url), |(path, _)| path);
            without_query.rsplit('/').next().unwrap_or_default().into()
        }
    };
    percent_decode(&raw)
}

fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(before, _)| before)
}

fn percent_decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned(),
    }
}
