//! Utility modules for error handling, configuration and paths

pub mod bundle_paths;
pub mod config;
pub mod error;
pub mod filename;

// Re-export for convenience
pub use bundle_paths::{get_app_support_dir, get_database_path, get_downloads_dir, get_history_path};
pub use config::{AppSettings, RetryConfig};
pub use error::{AudioloaderError, Result};
pub use filename::sanitize_filename;
