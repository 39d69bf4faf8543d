//! Property tests for filename resolution and progress parsing.

use civfetch_core::progress::parse_percent;
use civfetch_core::resolve_filename;
use proptest::prelude::*;

proptest! {
    #[test]
    fn disposition_filename_beats_path(
        name in "[A-Za-z0-9_.-]{1,32}",
        key in "[a-z0-9]{1,16}",
    ) {
        let disposition = format!("attachment; filename=\"{}\"", name);
        let url = format!(
            "https://storage.example.com/{}?X-Amz-Expires=60&response-content-disposition={}",
            key,
            urlencoding::encode(&disposition)
        );
        prop_assert_eq!(resolve_filename(&url), name);
    }

    #[test]
    fn path_segment_is_percent_decoded(name in "[A-Za-z0-9_. -]{1,32}") {
        prop_assume!(name.chars().any(|c| c.is_ascii_alphanumeric()));
        let url = format!("https://host/files/{}", urlencoding::encode(&name));
        prop_assert_eq!(resolve_filename(&url), name);
    }

    #[test]
    fn resolve_filename_never_empty(url in ".{0,64}") {
        prop_assert!(!resolve_filename(&url).is_empty());
    }

    #[test]
    fn percent_marker_is_clamped(
        n in 0u64..100_000,
        prefix in "[A-Za-z #:/\\[\\]]{0,12}",
        suffix in "[A-Za-z #:/\\[\\]]{0,12}",
    ) {
        let line = format!("{}({}%){}", prefix, n, suffix);
        prop_assert_eq!(parse_percent(&line), Some(n.min(100) as u8));
    }

    #[test]
    fn lines_without_marker_have_no_progress(line in "[^(%]{0,64}") {
        prop_assert_eq!(parse_percent(&line), None);
    }
}
