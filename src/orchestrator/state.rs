//! Per-run bookkeeping

use crate::extractor::{ItemRef, Metadata};
use crate::orchestrator::request::DownloadRequest;
use std::collections::{BTreeMap, HashMap};

/// Mutable record owned by exactly one run.
///
/// Items are keyed by ordinal so that entries sharing an id stay independent.
#[derive(Debug)]
pub struct RunState {
    pub request: DownloadRequest,
    pub metadata: Option<Metadata>,
    max_attempts: u32,
    attempt_counts: HashMap<usize, u32>,
    completed: BTreeMap<usize, ItemRef>,
    failed: BTreeMap<usize, (ItemRef, String)>,
}

impl RunState {
    pub fn new(request: DownloadRequest, max_attempts: u32) -> Self {
        Self {
            request,
            metadata: None,
            max_attempts,
            attempt_counts: HashMap::new(),
            completed: BTreeMap::new(),
            failed: BTreeMap::new(),
        }
    }

    /// Count one more attempt for `item`. Returns the new attempt number, or
    /// `None` once the budget is spent.
    pub fn begin_attempt(&mut self, item: &ItemRef) -> Option<u32> {
        let count = self.attempt_counts.entry(item.ordinal).or_insert(0);
        if *count >= self.max_attempts {
            return None;
        }
        *count += 1;
        Some(*count)
    }

    pub fn attempts(&self, item: &ItemRef) -> u32 {
        self.attempt_counts.get(&item.ordinal).copied().unwrap_or(0)
    }

    pub fn mark_completed(&mut self, item: &ItemRef) {
        self.failed.remove(&item.ordinal);
        self.completed.insert(item.ordinal, item.clone());
    }

    pub fn mark_failed(&mut self, item: &ItemRef, cause: impl Into<String>) {
        if self.completed.contains_key(&item.ordinal) {
            return;
        }
        self.failed.insert(item.ordinal, (item.clone(), cause.into()));
    }

    /// Whether the item already reached an outcome
    pub fn is_settled(&self, item: &ItemRef) -> bool {
        self.completed.contains_key(&item.ordinal) || self.failed.contains_key(&item.ordinal)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Consume the state, yielding completed and failed items in ordinal order
    pub fn into_outcomes(self) -> (Vec<ItemRef>, Vec<(ItemRef, String)>) {
        (
            self.completed.into_values().collect(),
            self.failed.into_values().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::request::{AudioFormat, AudioQuality};

    fn state(max: u32) -> RunState {
        RunState::new(
            DownloadRequest::new("u", "/tmp", AudioFormat::Mp3, AudioQuality::High),
            max,
        )
    }

    #[test]
    fn test_attempts_never_exceed_budget() {
        let mut state = state(3);
        let item = ItemRef::new("a", "A", 1, "u");

        assert_eq!(state.begin_attempt(&item), Some(1));
        assert_eq!(state.begin_attempt(&item), Some(2));
        assert_eq!(state.begin_attempt(&item), Some(3));
        assert_eq!(state.begin_attempt(&item), None);
        assert_eq!(state.attempts(&item), 3);
    }

    #[test]
    fn test_duplicate_ids_tracked_separately() {
        let mut state = state(1);
        let first = ItemRef::new("dup", "A", 1, "u");
        let second = ItemRef::new("dup", "A", 2, "u");

        assert_eq!(state.begin_attempt(&first), Some(1));
        assert_eq!(state.begin_attempt(&second), Some(1));

        state.mark_completed(&first);
        state.mark_failed(&second, "boom");
        assert_eq!(state.completed_count(), 1);
        assert_eq!(state.failed_count(), 1);
    }

    #[test]
    fn test_completed_and_failed_stay_disjoint() {
        let mut state = state(3);
        let item = ItemRef::new("a", "A", 1, "u");

        state.mark_completed(&item);
        state.mark_failed(&item, "late failure");
        assert!(state.is_settled(&item));
        assert_eq!(state.failed_count(), 0);

        let (completed, failed) = state.into_outcomes();
        assert_eq!(completed.len(), 1);
        assert!(failed.is_empty());
    }
}
