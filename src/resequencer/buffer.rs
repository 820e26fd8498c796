//! Ordered element buffer for the resequencer
//!
//! Keys are unique and iterate in sequence order. Each entry remembers when it
//! arrived so the engine can measure how long the head of the buffer has been
//! waiting behind a gap.

use crate::resequencer::config::DuplicatePolicy;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Buffered<E> {
    element: E,
    arrived: Instant,
}

/// Sequence-ordered map from key to element
#[derive(Debug)]
pub struct ResequencerBuffer<K, E> {
    entries: BTreeMap<K, Buffered<E>>,
}

impl<K: Ord, E> Default for ResequencerBuffer<K, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, E> ResequencerBuffer<K, E> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert `element` under `key`
    ///
    /// Returns `false` if the key is present and the policy is `Reject`; the
    /// buffer is left unchanged in that case. Overwriting keeps the arrival
    /// time of the element being replaced.
    pub fn insert(
        &mut self,
        key: K,
        element: E,
        arrived: Instant,
        policy: DuplicatePolicy,
    ) -> bool {
        match self.entries.get_mut(&key) {
            Some(existing) => match policy {
                DuplicatePolicy::Reject => false,
                DuplicatePolicy::Overwrite => {
                    existing.element = element;
                    true
                }
            },
            None => {
                self.entries.insert(key, Buffered { element, arrived });
                true
            }
        }
    }

    /// Smallest buffered key
    pub fn first_key(&self) -> Option<&K> {
        self.entries.keys().next()
    }

    /// How long the smallest-keyed element has been buffered at `now`
    pub fn oldest_age(&self, now: Instant) -> Option<Duration> {
        self.entries
            .values()
            .next()
            .map(|entry| now.saturating_duration_since(entry.arrived))
    }

    pub fn pop_first(&mut self) -> Option<(K, E)> {
        self.entries
            .pop_first()
            .map(|(key, entry)| (key, entry.element))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Remove every element in key order
    pub fn drain(&mut self) -> Vec<(K, E)> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(key, entry)| (key, entry.element))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_iterate_in_order_regardless_of_insertion() {
        let now = Instant::now();
        let mut buffer = ResequencerBuffer::new();
        for key in [5, 2, 9, 3] {
            assert!(buffer.insert(key, key * 10, now, DuplicatePolicy::Reject));
        }

        assert_eq!(buffer.keys().copied().collect::<Vec<_>>(), vec![2, 3, 5, 9]);
        assert_eq!(buffer.first_key(), Some(&2));
        assert_eq!(buffer.pop_first(), Some((2, 20)));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_duplicate_reject_leaves_buffer_unchanged() {
        let now = Instant::now();
        let mut buffer = ResequencerBuffer::new();
        buffer.insert(1, "first", now, DuplicatePolicy::Reject);

        assert!(!buffer.insert(1, "second", now, DuplicatePolicy::Reject));
        assert_eq!(buffer.drain(), vec![(1, "first")]);
    }

    #[test]
    fn test_duplicate_overwrite_keeps_arrival_time() {
        let start = Instant::now();
        let later = start + Duration::from_millis(500);
        let mut buffer = ResequencerBuffer::new();
        buffer.insert(1, "first", start, DuplicatePolicy::Overwrite);

        assert!(buffer.insert(1, "second", later, DuplicatePolicy::Overwrite));
        assert_eq!(buffer.len(), 1);
        assert_eq!(
            buffer.oldest_age(later + Duration::from_millis(100)),
            Some(Duration::from_millis(600))
        );
        assert_eq!(buffer.pop_first(), Some((1, "second")));
    }

    #[test]
    fn test_oldest_age_tracks_head_only() {
        let start = Instant::now();
        let mut buffer = ResequencerBuffer::new();
        buffer.insert(10, (), start, DuplicatePolicy::Reject);
        buffer.insert(4, (), start + Duration::from_millis(300), DuplicatePolicy::Reject);

        let now = start + Duration::from_millis(400);
        assert_eq!(buffer.oldest_age(now), Some(Duration::from_millis(100)));
        assert!(ResequencerBuffer::<i64, ()>::new().oldest_age(now).is_none());
    }
}
