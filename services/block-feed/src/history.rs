//! Bounded rolling history
//!
//! Newest-first ring buffer used for both the sub-block and the completed
//! block displays. Order is insertion order: out-of-order network delivery
//! is not corrected here.

use std::collections::VecDeque;

use serde::{Serialize, Serializer};

/// Newest-first sequence capped at `capacity` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the front, returning the evicted oldest entry if the
    /// history was already full.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.entries.push_front(item);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Most recently inserted entry.
    pub fn newest(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Oldest retained entry (next to be evicted).
    pub fn oldest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> RollingHistory<T> {
    /// Copy of the entries, newest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for RollingHistory<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}
