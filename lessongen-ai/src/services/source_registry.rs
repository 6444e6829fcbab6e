//! Source selection registry
//!
//! Tracks the documents offered as generation input and which of them are
//! picked. Iteration follows insertion order.

use crate::models::SourceItem;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct SourceSelectionRegistry {
    /// Items keyed by insertion sequence
    items: BTreeMap<u64, SourceItem>,
    /// Source id → insertion sequence
    index: HashMap<String, u64>,
    next_seq: u64,
    has_interacted: bool,
}

impl SourceSelectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source, or replace the one with the same id in place
    ///
    /// Returns the replaced item, if any.
    pub fn add_source(&mut self, item: SourceItem) -> Option<SourceItem> {
        if let Some(seq) = self.index.get(&item.id) {
            return self.items.insert(*seq, item);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(item.id.clone(), seq);
        self.items.insert(seq, item);
        None
    }

    pub fn remove_source(&mut self, id: &str) -> Option<SourceItem> {
        let seq = self.index.remove(id)?;
        self.items.remove(&seq)
    }

    /// Check or uncheck a source; returns false for unknown ids
    pub fn set_checked(&mut self, id: &str, checked: bool) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.checked = checked;
                self.has_interacted = true;
                true
            }
            None => false,
        }
    }

    /// Mark upload start/finish; returns false for unknown ids
    pub fn set_uploading(&mut self, id: &str, is_uploading: bool) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.is_uploading = is_uploading;
                true
            }
            None => false,
        }
    }

    /// Record the storage reference produced by a finished upload
    pub fn set_file_ref(&mut self, id: &str, file_ref: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.file_ref = Some(file_ref.into());
                true
            }
            None => false,
        }
    }

    /// Select or clear every source at once
    pub fn set_all_checked(&mut self, checked: bool) {
        for item in self.items.values_mut() {
            item.checked = checked;
        }
        self.has_interacted = true;
    }

    /// File references of checked sources that are not uploading
    ///
    /// Lazy and restartable: each call starts a fresh pass.
    pub fn checked_files(&self) -> impl Iterator<Item = &str> + '_ {
        self.items
            .values()
            .filter(|item| item.is_usable())
            .filter_map(|item| item.file_ref.as_deref())
    }

    /// Number of checked sources, including ones still uploading
    pub fn total_checked_sources(&self) -> usize {
        self.items.values().filter(|item| item.checked).count()
    }

    /// Whether the user has touched selection state at all
    pub fn has_interacted(&self) -> bool {
        self.has_interacted
    }

    pub fn get(&self, id: &str) -> Option<&SourceItem> {
        self.index.get(id).and_then(|seq| self.items.get(seq))
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut SourceItem> {
        let seq = self.index.get(id)?;
        self.items.get_mut(seq)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceItem> + '_ {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
