//! A capacity-bounded, insertion-ordered log that evicts its oldest entry.
//!
//! [`BoundedLog`] is the storage behind the query metric history and the
//! alert history. Unlike a plain ring buffer, [`push`](BoundedLog::push)
//! hands the evicted entry back to the caller so running aggregates (sums,
//! error counts) can be adjusted under the same lock that guards the log.
//!
//! # Complexity
//! - `push`, `len`, `oldest`, `newest` are **O(1)**.
//! - `newest_first`, `tail`, `retain` are **O(n)**.
//!
//! # Thread Safety
//! - No interior mutability. Wrap in a mutex when shared.

use std::collections::VecDeque;

/// Fixed-capacity FIFO log. Entries are kept oldest first.
///
/// # Examples
///
/// ```rust
/// use lorekeep_common::collections::BoundedLog;
///
/// let mut log = BoundedLog::new(2);
/// assert_eq!(log.push("a"), None);
/// assert_eq!(log.push("b"), None);
/// assert_eq!(log.push("c"), Some("a"));
/// assert_eq!(log.newest_first(10), vec![&"c", &"b"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Creates an empty log. A capacity of zero is clamped to `1`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends `entry`, returning the evicted oldest entry when the log was
    /// already full.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the log holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The oldest retained entry.
    #[must_use]
    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    /// The most recently appended entry.
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Up to `limit` entries, newest first.
    #[must_use]
    pub fn newest_first(&self, limit: usize) -> Vec<&T> {
        self.entries.iter().rev().take(limit).collect()
    }

    /// Up to `limit` of the most recent entries, in insertion order.
    #[must_use]
    pub fn tail(&self, limit: usize) -> Vec<&T> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).collect()
    }

    /// Keeps only entries matching `keep`, preserving order.
    ///
    /// Returns the number of entries removed.
    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(keep);
        before - self.entries.len()
    }

    /// Removes every entry, keeping the capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for BoundedLog<T> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<'a, T> IntoIterator for &'a BoundedLog<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
