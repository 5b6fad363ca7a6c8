//! Settings persistence

use crate::utils::config::AppSettings;
use crate::utils::error::Result;
use sqlx::{Pool, Row, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

const KEY_DOWNLOAD_LOCATION: &str = "download_location";
const KEY_AUDIO_FORMAT: &str = "audio_format";
const KEY_AUDIO_QUALITY: &str = "audio_quality";
const KEY_RETRY_ATTEMPTS: &str = "retry_attempts";
const KEY_RETRY_DELAY: &str = "retry_delay_secs";
const KEY_DARK_MODE: &str = "dark_mode";
const KEY_YTDLP_PATH: &str = "ytdlp_path";

/// Database manager
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<Sqlite>,
}

impl DatabaseManager {
    /// Create new database manager
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Save setting
    pub async fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        debug!("Saved setting: {} = {}", key, value);
        Ok(())
    }

    /// Get setting
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    /// Get all settings
    pub async fn get_all_settings(&self) -> Result<Vec<SettingsRecord>> {
        let rows = sqlx::query("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        let mut settings = Vec::with_capacity(rows.len());
        for row in rows {
            settings.push(SettingsRecord {
                key: row.get("key"),
                value: row.get("value"),
            });
        }

        Ok(settings)
    }

    /// Delete setting
    pub async fn delete_setting(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        debug!("Deleted setting: {}", key);
        Ok(())
    }

    /// Load `AppSettings`; missing or unparsable values keep their defaults
    pub async fn load_settings(&self) -> Result<AppSettings> {
        let mut settings = AppSettings::default();

        if let Some(location) = self.get_setting(KEY_DOWNLOAD_LOCATION).await? {
            settings.download_location = PathBuf::from(location);
        }

        if let Some(value) = self.get_setting(KEY_AUDIO_FORMAT).await? {
            settings.audio_format = parse_or_default(KEY_AUDIO_FORMAT, &value, settings.audio_format);
        }

        if let Some(value) = self.get_setting(KEY_AUDIO_QUALITY).await? {
            settings.audio_quality =
                parse_or_default(KEY_AUDIO_QUALITY, &value, settings.audio_quality);
        }

        if let Some(value) = self.get_setting(KEY_RETRY_ATTEMPTS).await? {
            settings.retry_attempts =
                parse_or_default(KEY_RETRY_ATTEMPTS, &value, settings.retry_attempts);
        }

        if let Some(value) = self.get_setting(KEY_RETRY_DELAY).await? {
            settings.retry_delay_secs =
                parse_or_default(KEY_RETRY_DELAY, &value, settings.retry_delay_secs);
        }

        if let Some(value) = self.get_setting(KEY_DARK_MODE).await? {
            settings.dark_mode = parse_or_default(KEY_DARK_MODE, &value, settings.dark_mode);
        }

        if let Some(value) = self.get_setting(KEY_YTDLP_PATH).await? {
            if !value.is_empty() {
                settings.ytdlp_path = Some(PathBuf::from(value));
            }
        }

        Ok(settings)
    }

    /// Persist every field of `settings`
    pub async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        self.save_setting(
            KEY_DOWNLOAD_LOCATION,
            &settings.download_location.to_string_lossy(),
        )
        .await?;
        self.save_setting(KEY_AUDIO_FORMAT, settings.audio_format.as_str())
            .await?;
        self.save_setting(KEY_AUDIO_QUALITY, &settings.audio_quality.kbps().to_string())
            .await?;
        self.save_setting(KEY_RETRY_ATTEMPTS, &settings.retry_attempts.to_string())
            .await?;
        self.save_setting(KEY_RETRY_DELAY, &settings.retry_delay_secs.to_string())
            .await?;
        self.save_setting(KEY_DARK_MODE, &settings.dark_mode.to_string())
            .await?;

        match &settings.ytdlp_path {
            Some(path) => {
                self.save_setting(KEY_YTDLP_PATH, &path.to_string_lossy())
                    .await?
            }
            None => self.delete_setting(KEY_YTDLP_PATH).await?,
        }

        Ok(())
    }
}

/// Settings record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsRecord {
    pub key: String,
    pub value: String,
}

fn parse_or_default<T: FromStr>(key: &str, value: &str, default: T) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("Ignoring invalid stored value for {}: {:?}", key, value);
            default
        }
    }
}
