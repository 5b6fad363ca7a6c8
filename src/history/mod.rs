//! Persisted download history

pub mod store;

pub use store::{HistoryEntry, HistoryStore};
