use std::collections::VecDeque;

pub const HISTORY_CAPACITY: usize = 20;

/// Bounded, insertion-ordered record of accepted commands.
///
/// Duplicates (exact text) are ignored; a full store drops its oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStore {
    cap: usize,
    buf: VecDeque<String>,
}

impl HistoryStore {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            buf: VecDeque::with_capacity(cap),
        }
    }

    /// Returns `true` when the entry was stored.
    pub fn add(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.cap == 0 || self.contains(&text) {
            return false;
        }
        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(text);
        true
    }

    pub fn contains(&self, text: &str) -> bool {
        self.buf.iter().any(|entry| entry == text)
    }

    /// Owned copy, oldest first.
    pub fn list(&self) -> Vec<String> {
        self.buf.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &String> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}
