//! Data structures exchanged with the extractor

use crate::orchestrator::request::{AudioFormat, AudioQuality};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Whether a probed URL points at one media item or a grouping of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Single,
    Collection,
}

/// Result of a metadata-only probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub kind: MediaKind,
    pub title: String,
    /// Empty when `kind` is `Single`
    #[serde(default)]
    pub items: Vec<ItemRef>,
}

impl Metadata {
    pub fn single(title: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Single,
            title: title.into(),
            items: Vec::new(),
        }
    }

    pub fn collection(title: impl Into<String>, items: Vec<ItemRef>) -> Self {
        Self {
            kind: MediaKind::Collection,
            title: title.into(),
            items,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.kind == MediaKind::Collection
    }
}

/// One entry of a collection. Ids are not guaranteed unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: String,
    pub title: String,
    /// 1-based position within the probed collection
    pub ordinal: usize,
    /// Address handed to `fetch`
    pub url: String,
}

impl ItemRef {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        ordinal: usize,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ordinal,
            url: url.into(),
        }
    }
}

/// Options resolved for one fetch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub audio_format: AudioFormat,
    pub audio_quality: AudioQuality,
    /// Directory the transcoded file lands in (output dir, plus the
    /// collection subfolder when one was requested)
    pub target_dir: PathBuf,
}

impl FetchOptions {
    /// yt-dlp style output template; the item title is filled in by the extractor
    pub fn output_template(&self) -> String {
        self.target_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }

    /// Final path of a transcoded item with the given title
    pub fn output_path(&self, item_title: &str) -> PathBuf {
        self.target_dir
            .join(format!("{}.{}", item_title, self.audio_format.extension()))
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}

/// Low-level status tag reported by the extractor while fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Downloading,
    Finished,
    Error,
}

/// Raw progress callback payload, strings exactly as the library formats them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTick {
    pub status: TickStatus,
    pub percent: String,
    pub speed: String,
}

impl ProgressTick {
    pub fn downloading(percent: impl Into<String>, speed: impl Into<String>) -> Self {
        Self {
            status: TickStatus::Downloading,
            percent: percent.into(),
            speed: speed.into(),
        }
    }

    pub fn finished() -> Self {
        Self {
            status: TickStatus::Finished,
            percent: "100%".to_string(),
            speed: String::new(),
        }
    }

    pub fn error() -> Self {
        Self {
            status: TickStatus::Error,
            percent: String::new(),
            speed: String::new(),
        }
    }
}
