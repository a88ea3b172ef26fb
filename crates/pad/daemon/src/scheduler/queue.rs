//! Keyed work queue
//!
//! A key is in at most one of three places: waiting in `pending`, being
//! processed (`in_flight`), or neither. Adding a key that is already waiting
//! is a no-op. Adding a key that is in flight marks it dirty so it is queued
//! again once the current pass finishes. This gives at most one concurrent
//! reconciliation per key while never losing a change notification.

use pad_types::ObjectKey;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct WorkQueue {
    pending: VecDeque<ObjectKey>,
    queued: HashSet<ObjectKey>,
    in_flight: HashSet<ObjectKey>,
    dirty: HashSet<ObjectKey>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a key. Returns true if a new item became ready to take.
    pub fn add(&mut self, key: ObjectKey) -> bool {
        if self.in_flight.contains(&key) {
            self.dirty.insert(key);
            return false;
        }
        if self.queued.insert(key.clone()) {
            self.pending.push_back(key);
            return true;
        }
        false
    }

    /// Take the next ready key and mark it in flight
    pub fn take(&mut self) -> Option<ObjectKey> {
        let key = self.pending.pop_front()?;
        self.queued.remove(&key);
        self.in_flight.insert(key.clone());
        Some(key)
    }

    /// Mark a pass finished. Returns true if the key was re-queued because
    /// it changed while in flight.
    pub fn finish(&mut self, key: &ObjectKey) -> bool {
        self.in_flight.remove(key);
        if self.dirty.remove(key) {
            return self.add(key.clone());
        }
        false
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("default", name)
    }

    #[test]
    fn test_duplicate_adds_coalesce() {
        let mut queue = WorkQueue::new();
        assert!(queue.add(key("a")));
        assert!(!queue.add(key("a")));
        assert!(queue.add(key("b")));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.take(), Some(key("a")));
        assert_eq!(queue.take(), Some(key("b")));
        assert_eq!(queue.take(), None);
    }

    #[test]
    fn test_in_flight_key_is_not_handed_out_twice() {
        let mut queue = WorkQueue::new();
        queue.add(key("a"));
        let taken = queue.take().unwrap();

        assert!(!queue.add(key("a")));
        assert!(!queue.add(key("a")));
        assert_eq!(queue.take(), None);
        assert_eq!(queue.in_flight(), 1);

        assert!(queue.finish(&taken));
        assert_eq!(queue.take(), Some(key("a")));
        assert!(!queue.finish(&key("a")));
        assert!(queue.is_empty());
        assert_eq!(queue.in_flight(), 0);
    }

    #[test]
    fn test_finish_without_changes_does_not_requeue() {
        let mut queue = WorkQueue::new();
        queue.add(key("a"));
        let taken = queue.take().unwrap();
        assert!(!queue.finish(&taken));
        assert_eq!(queue.take(), None);
    }
}
