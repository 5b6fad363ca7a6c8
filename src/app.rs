//! Application initialization: stored preferences, history and the
//! orchestrator wired together for a front end

use crate::database::{initialize_database, DatabaseManager};
use crate::extractor::{Extractor, YtDlpExtractor};
use crate::history::HistoryStore;
use crate::orchestrator::{DownloadRequest, Orchestrator};
use crate::utils::{bundle_paths, AppSettings};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Long-lived application state shared by every run
pub struct AudioloaderApp {
    settings: AppSettings,
    db_manager: DatabaseManager,
    history: HistoryStore,
}

impl AudioloaderApp {
    /// Open the stores in the platform application data directory
    pub async fn initialize() -> Result<Self> {
        Self::open(&bundle_paths::get_database_path(), &bundle_paths::get_history_path()).await
    }

    /// Open the stores at explicit locations
    pub async fn open(db_path: &Path, history_path: &Path) -> Result<Self> {
        let pool = initialize_database(db_path)
            .await
            .with_context(|| format!("failed to open preferences at {}", db_path.display()))?;
        let db_manager = DatabaseManager::new(pool);

        let settings = match db_manager.load_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                AppSettings::default()
            }
        };
        info!(
            "Settings loaded: {} @ {}kbps into {}",
            settings.audio_format,
            settings.audio_quality.kbps(),
            settings.download_location.display()
        );

        Ok(Self {
            settings,
            db_manager,
            history: HistoryStore::new(history_path),
        })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut AppSettings {
        &mut self.settings
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Persist the current settings as the new defaults
    pub async fn save_settings(&self) -> Result<()> {
        self.db_manager
            .save_settings(&self.settings)
            .await
            .context("failed to save settings")?;
        info!("Settings saved");
        Ok(())
    }

    /// Request for `url` using the stored defaults
    pub fn request_for(&self, url: &str) -> DownloadRequest {
        DownloadRequest::new(
            url,
            self.settings.download_location.clone(),
            self.settings.audio_format,
            self.settings.audio_quality,
        )
    }

    /// Orchestrator backed by yt-dlp, honoring a configured binary path
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let extractor = match &self.settings.ytdlp_path {
            Some(path) => YtDlpExtractor::with_path(path),
            None => YtDlpExtractor::new()?,
        };
        info!("Using yt-dlp at {}", extractor.ytdlp_path().display());
        Ok(self.orchestrator_with(Arc::new(extractor)))
    }

    /// Orchestrator over any extractor, sharing this app's retry policy and history
    pub fn orchestrator_with(&self, extractor: Arc<dyn Extractor>) -> Orchestrator {
        Orchestrator::new(extractor, self.settings.retry_config()).with_history(self.history.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::request::{AudioFormat, AudioQuality};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_settings_persist_across_opens() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("audioloader.db");
        let history_path = dir.path().join("download_history.json");

        {
            let mut app = AudioloaderApp::open(&db_path, &history_path).await.unwrap();
            app.settings_mut().audio_format = AudioFormat::Opus;
            app.settings_mut().audio_quality = AudioQuality::Low;
            app.settings_mut().download_location = dir.path().to_path_buf();
            app.save_settings().await.unwrap();
        }

        let app = AudioloaderApp::open(&db_path, &history_path).await.unwrap();
        assert_eq!(app.settings().audio_format, AudioFormat::Opus);

        let request = app.request_for("https://example.com/watch?v=1");
        assert_eq!(request.audio_quality, AudioQuality::Low);
        assert_eq!(request.output_directory, dir.path());
        assert_eq!(app.history().file_path(), history_path);
    }
}
