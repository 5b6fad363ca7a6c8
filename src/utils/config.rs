//! Application configuration

use crate::orchestrator::request::{AudioFormat, AudioQuality};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Per-item retry policy: fixed delay, no backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per item, first one included (at least 1)
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one
    pub delay: Duration,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Delay in whole seconds for display, rounded up so a sub-second delay
    /// never reads as 0
    pub fn delay_secs(&self) -> u64 {
        let secs = self.delay.as_secs();
        if self.delay.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Download location
    pub download_location: PathBuf,

    /// Default audio format
    pub audio_format: AudioFormat,

    /// Default bitrate target
    pub audio_quality: AudioQuality,

    /// Attempts per item
    pub retry_attempts: u32,

    /// Seconds between attempts
    pub retry_delay_secs: u64,

    /// Front-end theme preference
    pub dark_mode: bool,

    /// Explicit yt-dlp binary; searched for when unset
    pub ytdlp_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            download_location: dirs::download_dir().unwrap_or_else(|| PathBuf::from("./downloads")),
            audio_format: AudioFormat::Mp3,
            audio_quality: AudioQuality::High,
            retry_attempts: 3,
            retry_delay_secs: 5,
            dark_mode: false,
            ytdlp_path: None,
        }
    }
}

impl AppSettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.retry_attempts,
            Duration::from_secs(self.retry_delay_secs),
        )
    }
}
