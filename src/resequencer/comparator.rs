//! Sequence comparators
//!
//! A comparator extracts a sequence key from an element and knows which key
//! immediately follows another. The total order over keys comes from the
//! key type's `Ord`; the successor relation is what lets the engine tell a
//! contiguous run from a gap.

use crate::exchange::Exchange;
use std::fmt::Debug;

/// Ordering and adjacency over element sequence keys
///
/// For keys `a < b < c`, a buffer holding `a` and `c` but not `b` has a gap.
pub trait SequenceComparator<E>: Send + Sync {
    type Key: Ord + Clone + Debug + Send + Sync;

    /// Sequence key of `element`, or `None` if the element has no usable key
    fn sequence_key(&self, element: &E) -> Option<Self::Key>;

    /// True if `next` is the immediate successor of `previous`
    fn is_successor(&self, next: &Self::Key, previous: &Self::Key) -> bool;
}

fn is_integer_successor(next: i64, previous: i64) -> bool {
    previous.checked_add(1) == Some(next)
}

/// Reads an integer sequence number from an exchange header
///
/// ```rust
/// use seqroute::exchange::Exchange;
/// use seqroute::resequencer::{HeaderSequenceComparator, SequenceComparator};
///
/// let comparator = HeaderSequenceComparator::new("seqno");
/// let exchange = Exchange::new("B").with_header("seqno", 2);
/// assert_eq!(comparator.sequence_key(&exchange), Some(2));
/// assert!(comparator.is_successor(&3, &2));
/// ```
#[derive(Debug, Clone)]
pub struct HeaderSequenceComparator {
    header: String,
}

impl HeaderSequenceComparator {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }
}

impl Default for HeaderSequenceComparator {
    fn default() -> Self {
        Self::new("seqno")
    }
}

impl SequenceComparator<Exchange> for HeaderSequenceComparator {
    type Key = i64;

    fn sequence_key(&self, element: &Exchange) -> Option<i64> {
        element
            .header(&self.header)
            .and_then(|value| value.trim().parse::<i64>().ok())
    }

    fn is_successor(&self, next: &i64, previous: &i64) -> bool {
        is_integer_successor(*next, *previous)
    }
}

/// Integer sequence keys extracted by a closure
///
/// ```rust
/// use seqroute::resequencer::{KeyFnComparator, SequenceComparator};
///
/// let comparator = KeyFnComparator::new(|value: &u32| Some(i64::from(*value)));
/// assert_eq!(comparator.sequence_key(&7), Some(7));
/// ```
pub struct KeyFnComparator<F> {
    key_fn: F,
}

impl<F> KeyFnComparator<F> {
    pub fn new(key_fn: F) -> Self {
        Self { key_fn }
    }
}

impl<E, F> SequenceComparator<E> for KeyFnComparator<F>
where
    F: Fn(&E) -> Option<i64> + Send + Sync,
{
    type Key = i64;

    fn sequence_key(&self, element: &E) -> Option<i64> {
        (self.key_fn)(element)
    }

    fn is_successor(&self, next: &i64, previous: &i64) -> bool {
        is_integer_successor(*next, *previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_comparator_reads_and_rejects_values() {
        let comparator = HeaderSequenceComparator::default();

        assert_eq!(
            comparator.sequence_key(&Exchange::new("a").with_header("seqno", " 12 ")),
            Some(12)
        );
        assert_eq!(
            comparator.sequence_key(&Exchange::new("b").with_header("seqno", "twelve")),
            None
        );
        assert_eq!(comparator.sequence_key(&Exchange::new("c")), None);
    }

    #[test]
    fn test_successor_relation() {
        let comparator = HeaderSequenceComparator::new("n");

        assert!(comparator.is_successor(&2, &1));
        assert!(!comparator.is_successor(&3, &1));
        assert!(!comparator.is_successor(&1, &2));
        assert!(!comparator.is_successor(&i64::MIN, &i64::MAX));
    }

    #[test]
    fn test_key_fn_comparator() {
        let comparator = KeyFnComparator::new(|value: &i64| (*value >= 0).then_some(*value));

        assert_eq!(comparator.sequence_key(&4), Some(4));
        assert_eq!(comparator.sequence_key(&-1), None);
        assert!(comparator.is_successor(&5, &4));
    }
}
