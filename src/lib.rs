//! Audioloader library

pub mod app;
pub mod database;
pub mod extractor;
pub mod history;
pub mod orchestrator;
pub mod selection;
pub mod utils;

// Re-export main types for easier use
pub use extractor::{Extractor, ItemRef, MediaKind, Metadata, YtDlpExtractor};
pub use history::{HistoryEntry, HistoryStore};
pub use orchestrator::{
    AudioFormat, AudioQuality, DownloadRequest, ErrorKind, Orchestrator, RunEvent, RunHandle,
    RunSummary,
};
pub use selection::{SelectionDecision, SelectionGate};
pub use utils::{AppSettings, AudioloaderError, RetryConfig};
