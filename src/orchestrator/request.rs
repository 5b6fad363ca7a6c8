//! Download request and the audio options a front-end exposes

use crate::utils::error::{AudioloaderError, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Target audio container/codec handed to the extractor's postprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Wav,
    Flac,
    Opus,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Mp3,
        AudioFormat::M4a,
        AudioFormat::Wav,
        AudioFormat::Flac,
        AudioFormat::Opus,
    ];

    /// Lowercase codec name, also used as the file extension
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "opus",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = AudioloaderError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        AudioFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == lowered)
            .ok_or_else(|| AudioloaderError::InvalidInput(format!("unsupported audio format: {}", s)))
    }
}

/// Bitrate target in kbps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioQuality {
    #[default]
    #[serde(rename = "320")]
    High,
    #[serde(rename = "192")]
    Standard,
    #[serde(rename = "128")]
    Medium,
    #[serde(rename = "96")]
    Low,
}

impl AudioQuality {
    pub const ALL: [AudioQuality; 4] = [
        AudioQuality::High,
        AudioQuality::Standard,
        AudioQuality::Medium,
        AudioQuality::Low,
    ];

    pub fn kbps(&self) -> u32 {
        match self {
            AudioQuality::High => 320,
            AudioQuality::Standard => 192,
            AudioQuality::Medium => 128,
            AudioQuality::Low => 96,
        }
    }

    /// Get string representation for display
    pub fn label(&self) -> &'static str {
        match self {
            AudioQuality::High => "High Quality (320kbps)",
            AudioQuality::Standard => "Standard Quality (192kbps)",
            AudioQuality::Medium => "Medium Quality (128kbps)",
            AudioQuality::Low => "Low Quality (96kbps)",
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kbps())
    }
}

impl FromStr for AudioQuality {
    type Err = AudioloaderError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches("kbps").trim_end_matches('k');
        let kbps: u32 = trimmed
            .parse()
            .map_err(|_| AudioloaderError::InvalidInput(format!("unsupported audio quality: {}", s)))?;
        AudioQuality::ALL
            .into_iter()
            .find(|q| q.kbps() == kbps)
            .ok_or_else(|| AudioloaderError::InvalidInput(format!("unsupported audio quality: {}", s)))
    }
}

/// One user submission. Captured by value when a run starts and never
/// read back from front-end state afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_directory: PathBuf,
    pub audio_format: AudioFormat,
    pub audio_quality: AudioQuality,
}

impl DownloadRequest {
    pub fn new(
        url: impl Into<String>,
        output_directory: impl Into<PathBuf>,
        audio_format: AudioFormat,
        audio_quality: AudioQuality,
    ) -> Self {
        Self {
            url: url.into(),
            output_directory: output_directory.into(),
            audio_format,
            audio_quality,
        }
    }

    /// Reject bad input before any orchestration starts.
    ///
    /// Returns a normalized copy: trimmed URL and an absolute output directory.
    pub fn validated(&self) -> Result<Self> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(AudioloaderError::InvalidInput(
                "Please enter a valid URL".to_string(),
            ));
        }

        let output_directory = absolute_dir(&self.output_directory)?;

        Ok(Self {
            url: url.to_string(),
            output_directory,
            audio_format: self.audio_format,
            audio_quality: self.audio_quality,
        })
    }
}

fn absolute_dir(dir: &Path) -> Result<PathBuf> {
    if dir.as_os_str().is_empty() {
        return Err(AudioloaderError::InvalidInput(
            "Please enter an output directory".to_string(),
        ));
    }
    if !dir.is_dir() {
        return Err(AudioloaderError::InvalidInput(format!(
            "Output directory does not exist: {}",
            dir.display()
        )));
    }
    Ok(dir.absolutize()?.into_owned())
}
