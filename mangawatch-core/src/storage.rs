use std::collections::HashSet;

use tracing::debug;

/// Chapter ids already announced during this process lifetime.
///
/// Kept in memory only and never evicted, so it forgets everything on restart.
#[derive(Debug, Clone, Default)]
pub struct SeenState {
    chapters: HashSet<String>,
}

impl SeenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.chapters.contains(item_id)
    }

    /// Records an announced chapter. Returns `false` if it was already known.
    pub fn mark(&mut self, item_id: &str) -> bool {
        let inserted = self.chapters.insert(item_id.to_owned());
        if !inserted {
            debug!(chapter_id = item_id, "chapter re-announced");
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenState {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            chapters: iter.into_iter().map(Into::into).collect(),
        }
    }
}
