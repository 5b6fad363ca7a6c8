//! Application data path resolution
//!
//! Paths are resolved from platform conventions rather than the working
//! directory: a binary started from a desktop launcher or a service manager
//! often runs with cwd "/", where relative paths silently land elsewhere.
//!
//! - Application data: `<data dir>/Audioloader/` (history JSON, preferences DB)
//! - Downloads: the platform Downloads directory, never `./downloads`

use crate::history::store::HISTORY_FILE_NAME;
use std::path::PathBuf;
use tracing::{debug, warn};

const APP_DIR_NAME: &str = "Audioloader";
const DATABASE_FILE_NAME: &str = "audioloader.db";

/// Get the application data directory, creating it if needed.
///
/// `~/.local/share/Audioloader` on Linux,
/// `~/Library/Application Support/Audioloader` on macOS,
/// `%APPDATA%\Audioloader` on Windows.
pub fn get_app_support_dir() -> PathBuf {
    let dir = dirs::data_dir()
        .map(|data| data.join(APP_DIR_NAME))
        .or_else(|| {
            // Fallback: explicitly construct from home directory
            dirs::home_dir().map(|home| home.join(".audioloader"))
        })
        .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME));

    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!(
            "Failed to create app data directory {:?}: {}. Will attempt to use it anyway",
            dir, e
        );
    }

    debug!("App data directory: {:?}", dir);
    dir
}

/// Preferences database: `<app data>/audioloader.db`
pub fn get_database_path() -> PathBuf {
    get_app_support_dir().join(DATABASE_FILE_NAME)
}

/// History file: `<app data>/download_history.json`
pub fn get_history_path() -> PathBuf {
    get_app_support_dir().join(HISTORY_FILE_NAME)
}

/// Get the downloads directory.
///
/// Falls back to `~/Downloads`, then the temp dir.
pub fn get_downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| {
            warn!("Could not determine Downloads directory, using temp dir");
            std::env::temp_dir()
        })
}
