//! Download orchestration: one run per request, events out, selection in

pub mod engine;
pub mod handle;
pub mod messages;
pub mod progress;
pub mod request;
pub mod state;

// Re-export for convenience
pub use engine::Orchestrator;
pub use handle::{RunControl, RunEvents, RunHandle, RunTask};
pub use messages::{ErrorKind, RunEvent, RunOutcome, RunReport, RunSummary};
pub use request::{AudioFormat, AudioQuality, DownloadRequest};
