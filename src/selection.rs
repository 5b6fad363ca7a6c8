//! Playlist selection checklist
//!
//! Pure presentation logic over already-probed metadata. A front-end renders
//! the entries, lets the user toggle them, and hands `decision()` back to the
//! run that is waiting on it.

use crate::extractor::{ItemRef, Metadata};
use std::collections::HashSet;

/// Caller's answer to `SelectionNeeded`. An empty set means cancel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionDecision {
    pub chosen_item_ids: HashSet<String>,
    pub create_subfolder: bool,
}

impl SelectionDecision {
    pub fn new<I, S>(ids: I, create_subfolder: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chosen_item_ids: ids.into_iter().map(Into::into).collect(),
            create_subfolder,
        }
    }

    pub fn cancel() -> Self {
        Self::default()
    }

    pub fn is_cancel(&self) -> bool {
        self.chosen_item_ids.is_empty()
    }

    /// Items of `metadata` picked by this decision, in ascending ordinal order.
    /// Every entry sharing a chosen id is kept.
    pub fn apply(&self, metadata: &Metadata) -> Vec<ItemRef> {
        let mut chosen: Vec<ItemRef> = metadata
            .items
            .iter()
            .filter(|item| self.chosen_item_ids.contains(&item.id))
            .cloned()
            .collect();
        chosen.sort_by_key(|item| item.ordinal);
        chosen
    }
}

/// One checklist row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub item: ItemRef,
    pub checked: bool,
}

impl SelectionEntry {
    /// Row label, e.g. `"3. Song title"`
    pub fn label(&self) -> String {
        format!("{}. {}", self.item.ordinal, self.item.title)
    }
}

/// Checklist state with everything pre-checked
#[derive(Debug, Clone)]
pub struct SelectionGate {
    title: String,
    entries: Vec<SelectionEntry>,
    create_subfolder: bool,
}

impl SelectionGate {
    pub fn new(metadata: &Metadata) -> Self {
        Self {
            title: metadata.title.clone(),
            entries: metadata
                .items
                .iter()
                .cloned()
                .map(|item| SelectionEntry { item, checked: true })
                .collect(),
            create_subfolder: true,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    /// Bulk toggle
    pub fn select_all(&mut self, checked: bool) {
        for entry in &mut self.entries {
            entry.checked = checked;
        }
    }

    /// Toggle the row at `ordinal`; returns false if there is no such row.
    ///
    /// Decisions are keyed by item id, so rows sharing an id are downloaded
    /// together as long as any one of them stays checked.
    pub fn set_checked(&mut self, ordinal: usize, checked: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.item.ordinal == ordinal) {
            Some(entry) => {
                entry.checked = checked;
                true
            }
            None => false,
        }
    }

    pub fn set_create_subfolder(&mut self, create: bool) {
        self.create_subfolder = create;
    }

    pub fn create_subfolder(&self) -> bool {
        self.create_subfolder
    }

    pub fn selected_count(&self) -> usize {
        self.entries.iter().filter(|e| e.checked).count()
    }

    pub fn decision(&self) -> SelectionDecision {
        SelectionDecision {
            chosen_item_ids: self
                .entries
                .iter()
                .filter(|e| e.checked)
                .map(|e| e.item.id.clone())
                .collect(),
            create_subfolder: self.create_subfolder,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Playlist: {} ({}/{} songs selected)",
            self.title,
            self.selected_count(),
            self.entries.len()
        )
    }
}
