//! A keyed priority queue which pops the *lowest* priority first.
//!
//! `keyed_priority_queue` is a max-heap.  The cycle timer needs the
//! earliest deadline at the top, and it needs to be able to find an
//! entry by key in order to cancel it, so we wrap the max-heap and
//! reverse the ordering of the priorities.
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::Hash;

use keyed_priority_queue::KeyedPriorityQueue;

#[derive(Debug)]
struct ReverseOrdered<T> {
    inner: T,
}

impl<T> From<T> for ReverseOrdered<T> {
    fn from(inner: T) -> ReverseOrdered<T> {
        ReverseOrdered { inner }
    }
}

impl<T: Ord> PartialOrd for ReverseOrdered<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Eq> Eq for ReverseOrdered<T> {}

impl<T: Eq> PartialEq for ReverseOrdered<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Ord> Ord for ReverseOrdered<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.inner.cmp(&self.inner)
    }
}

#[test]
fn test_reverse_order() {
    assert_eq!(ReverseOrdered::from(1), ReverseOrdered::from(1));
    assert_ne!(ReverseOrdered::from(1), ReverseOrdered::from(0));
    assert!(ReverseOrdered::from(1) < ReverseOrdered::from(0));
    assert!(ReverseOrdered::from(1) <= ReverseOrdered::from(0));
    assert!(ReverseOrdered::from(u64::MAX) < ReverseOrdered::from(0));
}

/// Returned by [`KeyedMinPriorityQueue::set_priority`] when the key
/// is not in the queue.
#[derive(Debug, PartialEq, Eq)]
pub struct UnknownKeyError {}

impl Display for UnknownKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("key is not present in the priority queue")
    }
}

impl std::error::Error for UnknownKeyError {}

/// A priority queue in which each key appears at most once and
/// [`KeyedMinPriorityQueue::pop`] yields the entry having the
/// smallest priority.
///
/// `push`, `pop`, `remove` and `set_priority` are O(log n); `peek` is
/// O(1).
pub struct KeyedMinPriorityQueue<K: Hash + Eq, P: Ord> {
    items: KeyedPriorityQueue<K, ReverseOrdered<P>>,
}

impl<K, P> KeyedMinPriorityQueue<K, P>
where
    K: Hash + Eq,
    P: Ord,
{
    pub fn new() -> KeyedMinPriorityQueue<K, P> {
        KeyedMinPriorityQueue {
            items: KeyedPriorityQueue::<K, ReverseOrdered<P>>::new(),
        }
    }

    pub fn peek(&self) -> Option<(&K, &P)> {
        self.items.peek().map(|(k, p)| (k, &p.inner))
    }

    pub fn pop(&mut self) -> Option<(K, P)> {
        self.items.pop().map(|(k, p)| (k, p.inner))
    }

    /// Insert `key` with `priority`.  If the key was already present
    /// its priority is replaced and the old one returned; the key
    /// never appears twice.
    pub fn push(&mut self, key: K, priority: P) -> Option<P> {
        self.items
            .push(key, ReverseOrdered::from(priority))
            .map(|rd| rd.inner)
    }

    /// Remove `key`, returning its priority if it was present.
    pub fn remove(&mut self, key: &K) -> Option<P> {
        self.items.remove(key).map(|rd| rd.inner)
    }

    pub fn priority(&self, key: &K) -> Option<&P> {
        self.items.get_priority(key).map(|rd| &rd.inner)
    }

    /// Update the priority of a item (identified by `key`) in the
    /// priority queue.
    ///
    /// # Errors
    ///
    /// `Err(UnknownKeyError)` is returned when the indicated key is
    /// not present.
    pub fn set_priority(&mut self, key: &K, priority: P) -> Result<P, UnknownKeyError> {
        match self.items.set_priority(key, ReverseOrdered::from(priority)) {
            Ok(priority) => Ok(priority.inner),
            Err(_) => Err(UnknownKeyError {}),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K, P> Default for KeyedMinPriorityQueue<K, P>
where
    K: Hash + Eq,
    P: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P> Debug for KeyedMinPriorityQueue<K, P>
where
    K: Hash + Eq + Debug,
    P: Ord + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedMinPriorityQueue")
            .field("items", &self.items)
            .finish()
    }
}

#[test]
fn test_empty() {
    let mut q: KeyedMinPriorityQueue<usize, u64> = KeyedMinPriorityQueue::default();
    assert!(q.is_empty());
    assert_eq!(0, q.len());
    assert_eq!(q.peek(), None);
    assert_eq!(q.pop(), None);
    assert_eq!(q.remove(&3), None);
}

#[test]
fn test_repeat_push_keeps_one_entry() {
    let mut q: KeyedMinPriorityQueue<usize, u64> = KeyedMinPriorityQueue::new();
    assert_eq!(q.push(0, 200), None);
    assert_eq!(q.push(0, 400), Some(200));
    assert_eq!(q.push(0, 300), Some(400));
    assert_eq!(q.len(), 1);
    assert_eq!(q.pop(), Some((0, 300)));
    assert!(q.is_empty());
}

#[test]
fn test_pops_lowest_first() {
    let mut q: KeyedMinPriorityQueue<char, u64> = KeyedMinPriorityQueue::new();
    q.push('x', 100);
    q.push('y', 50);
    q.push('z', 75);
    assert_eq!(q.peek(), Some((&'y', &50)));
    assert_eq!(q.pop(), Some(('y', 50)));
    assert_eq!(q.pop(), Some(('z', 75)));
    assert_eq!(q.pop(), Some(('x', 100)));
    assert!(q.is_empty());
}

#[test]
fn test_remove_and_set_priority() {
    let mut q: KeyedMinPriorityQueue<char, u64> = KeyedMinPriorityQueue::new();
    q.push('a', 10);
    q.push('b', 20);
    assert_eq!(q.remove(&'a'), Some(10));
    assert_eq!(q.remove(&'a'), None);
    assert_eq!(q.priority(&'b'), Some(&20));
    assert_eq!(q.set_priority(&'b', 5), Ok(20));
    assert_eq!(q.set_priority(&'a', 5), Err(UnknownKeyError {}));
    assert_eq!(q.pop(), Some(('b', 5)));
}

#[cfg(test)]
mod proptests {
    use super::KeyedMinPriorityQueue;
    use test_strategy::proptest;

    #[proptest]
    fn pops_in_non_decreasing_order(priorities: Vec<u32>) {
        let mut q: KeyedMinPriorityQueue<usize, u32> = KeyedMinPriorityQueue::new();
        for (key, pri) in priorities.iter().enumerate() {
            q.push(key, *pri);
        }
        let mut previous: Option<u32> = None;
        let mut count = 0;
        while let Some((_, pri)) = q.pop() {
            if let Some(prev) = previous {
                assert!(prev <= pri);
            }
            previous = Some(pri);
            count += 1;
        }
        assert_eq!(count, priorities.len());
    }
}
