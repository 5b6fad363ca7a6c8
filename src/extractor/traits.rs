use crate::extractor::models::{FetchOptions, Metadata, ProgressTick};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Core trait for the external extraction/transcoding collaborator
///
/// This trait isolates the orchestrator from the specific extraction tool
/// (yt-dlp subprocess, test doubles, etc.).
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns a unique identifier for this extractor (e.g., "ytdlp")
    fn id(&self) -> &'static str;

    /// Metadata-only inspection of a URL; nothing is downloaded
    async fn probe(&self, url: &str) -> Result<Metadata>;

    /// Download and transcode one item.
    ///
    /// Progress is pushed on `progress` as it arrives; a closed receiver must
    /// not fail the fetch. When `cancel` fires mid-fetch the implementation
    /// stops and removes its partial output before returning `Cancelled`.
    async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
        progress: mpsc::Sender<ProgressTick>,
        cancel: CancellationToken,
    ) -> Result<()>;
}
