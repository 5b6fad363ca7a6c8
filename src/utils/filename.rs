//! Filesystem-safe names for collection folders

/// Characters invalid on Windows/macOS/Linux filesystems
const INVALID_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Folder name used when a collection title sanitizes to nothing
pub const FALLBACK_FOLDER: &str = "Playlist";

/// Sanitize a collection title for use as a single path segment.
///
/// Invalid characters become `_`; leading and trailing spaces and periods are
/// stripped. Applying it twice yields the same result as applying it once.
///
/// # Examples
/// ```
/// use audioloader::utils::filename::sanitize_filename;
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
/// assert_eq!(sanitize_filename(" ..Mix.. "), "Mix");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    replaced
        .trim_matches(|c| c == ' ' || c == '.')
        .to_string()
}

/// Sanitized folder name, never empty
pub fn collection_folder_name(title: &str) -> String {
    let sanitized = sanitize_filename(title);
    if sanitized.is_empty() {
        FALLBACK_FOLDER.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_every_invalid_char() {
        assert_eq!(sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_strips_spaces_and_periods_at_edges_only() {
        assert_eq!(sanitize_filename("  . My Mix . "), "My Mix");
        assert_eq!(sanitize_filename("Vol. 2"), "Vol. 2");
    }

    #[test]
    fn test_keeps_other_whitespace() {
        // Only spaces are stripped, matching the folder-name rule
        assert_eq!(sanitize_filename("\tTabs\t"), "\tTabs\t");
    }

    #[test]
    fn test_idempotent_on_samples() {
        for sample in ["", "...", " a/b ", "?.?", "Best of 2024 / Part 1.", "ok"] {
            let once = sanitize_filename(sample);
            assert_eq!(sanitize_filename(&once), once, "sample {:?}", sample);
        }
    }

    #[test]
    fn test_collection_folder_fallback() {
        assert_eq!(collection_folder_name(" . . "), FALLBACK_FOLDER);
        assert_eq!(collection_folder_name("Chill"), "Chill");
        assert_eq!(collection_folder_name("?"), "_");
    }
}
