use crate::extractor::{ItemRef, Metadata};
use crate::orchestrator::request::DownloadRequest;
use serde::Serialize;
use std::fmt;

/// Machine-inspectable class of an `Error` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// URL unreachable or unsupported
    Probe,
    /// Collection probed fine but has nothing in it
    EmptyCollection,
    /// Caller answered the selection prompt with nothing
    SelectionCancelled,
    /// One item exhausted its attempts; the run carries on
    Fetch,
    /// Output folder could not be prepared
    Output,
    /// Cooperative cancellation through the run handle
    Cancelled,
}

impl ErrorKind {
    /// Whether an error of this kind ends the run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ErrorKind::Fetch)
    }
}

/// Per-run outcome counts carried by `Finished`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Events sent from a run to its caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Progress {
        message: String,
        percent: f64,
    },
    RetryNotice {
        error: String,
        delay_secs: u64,
    },
    SelectionNeeded {
        metadata: Metadata,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    Finished {
        summary: RunSummary,
    },
}

impl RunEvent {
    pub fn progress(message: impl Into<String>, percent: f64) -> Self {
        RunEvent::Progress {
            message: message.into(),
            percent,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        RunEvent::Error {
            kind,
            message: message.into(),
        }
    }

    /// `Finished`, or an `Error` that aborts the run
    pub fn is_terminal(&self) -> bool {
        match self {
            RunEvent::Finished { .. } => true,
            RunEvent::Error { kind, .. } => kind.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::Progress { message, .. } => f.write_str(message),
            RunEvent::RetryNotice { error, delay_secs } => {
                write!(f, "Error: {}. Retrying in {} seconds...", error, delay_secs)
            }
            RunEvent::SelectionNeeded { metadata } => write!(
                f,
                "Playlist: {} ({} entries), waiting for selection",
                metadata.title,
                metadata.items.len()
            ),
            RunEvent::Error { message, .. } => write!(f, "Error: {}", message),
            RunEvent::Finished { summary } if summary.failed == 0 => {
                f.write_str("Conversion complete!")
            }
            RunEvent::Finished { summary } => write!(
                f,
                "Finished: {} succeeded, {} failed",
                summary.completed, summary.failed
            ),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    Aborted(ErrorKind),
}

/// Returned by `RunHandle::wait` once the run is over
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub request: DownloadRequest,
    pub outcome: RunOutcome,
    pub completed: Vec<ItemRef>,
    pub failed: Vec<(ItemRef, String)>,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            completed: self.completed.len(),
            failed: self.failed.len(),
        }
    }
}
