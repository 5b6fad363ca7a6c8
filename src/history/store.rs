use crate::orchestrator::request::{AudioFormat, AudioQuality, DownloadRequest};
use crate::utils::error::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const HISTORY_FILE_NAME: &str = "download_history.json";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One recorded run. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub url: String,
    pub format: AudioFormat,
    pub quality: AudioQuality,
}

impl HistoryEntry {
    pub fn from_request(request: &DownloadRequest) -> Self {
        Self::from_request_at(request, Local::now())
    }

    pub fn from_request_at(request: &DownloadRequest, at: DateTime<Local>) -> Self {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            url: request.url.clone(),
            format: request.audio_format,
            quality: request.audio_quality,
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({}kbps)\n{}",
            self.timestamp, self.format, self.quality, self.url
        )
    }
}

/// JSON-file history, rewritten as a whole on every change.
///
/// Clones share one write lock, so concurrent runs appending through the same
/// store never lose each other's entries.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    file_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl HistoryStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store named `download_history.json` inside `base_dir`
    pub fn in_dir(base_dir: &Path) -> Self {
        Self::new(base_dir.join(HISTORY_FILE_NAME))
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// All entries, oldest first. A missing or corrupt file reads as empty.
    pub async fn load_all(&self) -> Vec<HistoryEntry> {
        let content = match tokio::fs::read_to_string(&self.file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read history {:?}: {}", self.file_path, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring corrupt history {:?}: {}", self.file_path, e);
                Vec::new()
            }
        }
    }

    /// Entries in display order
    pub async fn load_newest_first(&self) -> Vec<HistoryEntry> {
        let mut entries = self.load_all().await;
        entries.reverse();
        entries
    }

    pub async fn append(&self, entry: HistoryEntry) -> Result<()> {
        // Held across the whole read-modify-write
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load_all().await;
        entries.push(entry);
        self.save(&entries).await?;
        debug!("History now holds {} entries", entries.len());
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save(&[]).await
    }

    async fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.file_path, json).await?;
        Ok(())
    }
}
