pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::{FetchOptions, ItemRef, MediaKind, Metadata, ProgressTick, TickStatus};
pub use traits::Extractor;
pub use ytdlp::YtDlpExtractor;
