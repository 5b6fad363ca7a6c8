//! Property checks for folder-name sanitization and progress parsing

use audioloader::extractor::ytdlp::parse_progress_line;
use audioloader::orchestrator::progress::parse_percent;
use audioloader::utils::filename::{collection_folder_name, sanitize_filename};
use proptest::prelude::*;

const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const EDGE: &[char] = &[' ', '.'];

proptest! {
    #[test]
    fn sanitize_is_idempotent(title in "\\PC*") {
        let once = sanitize_filename(&title);
        prop_assert_eq!(sanitize_filename(&once), once);
    }

    #[test]
    fn sanitized_names_are_single_safe_segments(title in "\\PC*") {
        let name = sanitize_filename(&title);
        prop_assert!(!name.contains(INVALID));
        prop_assert!(!name.starts_with(EDGE));
        prop_assert!(!name.ends_with(EDGE));
    }

    #[test]
    fn folder_name_is_never_empty(title in "[ .:/?]*") {
        prop_assert!(!collection_folder_name(&title).is_empty());
    }

    #[test]
    fn percent_parsing_never_fails(raw in "\\PC{0,12}") {
        let value = parse_percent(&raw);
        prop_assert!(value.is_finite());
    }

    #[test]
    fn download_lines_keep_their_percentage(whole in 0u32..100, frac in 0u32..10) {
        let line = format!("[download]  {}.{}% of ~ 10.00MiB at  1.50MiB/s ETA 00:05", whole, frac);
        let tick = parse_progress_line(&line).expect("download line");
        let expected = format!("{}.{}", whole, frac).parse::<f64>().unwrap();
        prop_assert!((parse_percent(&tick.percent) - expected).abs() < 1e-9);
        prop_assert_eq!(tick.speed, "1.50MiB/s");
    }
}
