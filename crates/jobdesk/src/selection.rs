//! Row selection for the jobs table.

use std::collections::HashSet;

/// Set of selected job ids, scoped to the loaded page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: HashSet<String>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` if absent, removes it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    /// Clears the selection if it already equals `visible`, otherwise selects exactly `visible`.
    pub fn select_all_visible<S: AsRef<str>>(&mut self, visible: &[S]) {
        if self.is_all_selected(visible) {
            self.selected.clear();
        } else {
            self.selected = visible.iter().map(|id| id.as_ref().to_string()).collect();
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drops ids that are not in `visible`. Returns how many were dropped.
    pub fn retain_visible<S: AsRef<str>>(&mut self, visible: &[S]) -> usize {
        let visible: HashSet<&str> = visible.iter().map(|id| id.as_ref()).collect();
        let before = self.selected.len();
        self.selected.retain(|id| visible.contains(id.as_str()));
        before - self.selected.len()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// True when the selection is non-empty and equals `visible` as a set.
    pub fn is_all_selected<S: AsRef<str>>(&self, visible: &[S]) -> bool {
        if visible.is_empty() {
            return false;
        }
        let visible: HashSet<&str> = visible.iter().map(|id| id.as_ref()).collect();
        visible.len() == self.selected.len()
            && self.selected.iter().all(|id| visible.contains(id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }
}
