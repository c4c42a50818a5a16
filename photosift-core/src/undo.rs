//! Undo Stack
//!
//! Bounded history of deletions. Once full, pushing drops the oldest entry,
//! which then becomes permanently unrecoverable; it is handed back to the
//! caller so the deletion can still be accounted for.

use crate::item::Item;
use std::collections::VecDeque;

/// One recoverable deletion
#[derive(Debug, Clone)]
pub struct UndoEntry {
    /// Index the item occupied in the live sequence
    pub position: usize,
    pub item: Item,
    /// The delete moved the cursor one step left
    pub cursor_shifted: bool,
}

/// Bounded stack (None capacity = unbounded)
#[derive(Debug)]
pub struct UndoStack {
    entries: VecDeque<UndoEntry>,
    capacity: Option<usize>,
}

impl UndoStack {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Push an entry, returning the oldest one if it had to be discarded
    pub fn push(&mut self, entry: UndoEntry) -> Option<UndoEntry> {
        let evicted = match self.capacity {
            Some(0) => return Some(entry),
            Some(cap) if self.entries.len() >= cap => self.entries.pop_front(),
            _ => None,
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Pop the most recent entry
    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &UndoEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, position: usize) -> UndoEntry {
        UndoEntry {
            position,
            item: Item::new(key, format!("/p/{key}")),
            cursor_shifted: false,
        }
    }

    #[test]
    fn test_lifo_order() {
        let mut stack = UndoStack::new(None);
        stack.push(entry("x", 0));
        stack.push(entry("y", 1));
        assert_eq!(stack.pop().unwrap().item.key(), "y");
        assert_eq!(stack.pop().unwrap().item.key(), "x");
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_capacity_discards_oldest() {
        let mut stack = UndoStack::new(Some(2));
        assert!(stack.push(entry("x", 0)).is_none());
        assert!(stack.push(entry("y", 0)).is_none());
        let dropped = stack.push(entry("z", 0)).unwrap();
        assert_eq!(dropped.item.key(), "x");

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().item.key(), "z");
        assert_eq!(stack.pop().unwrap().item.key(), "y");
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let mut stack = UndoStack::new(None);
        for i in 0..100 {
            assert!(stack.push(entry(&format!("k{i}"), i)).is_none());
        }
        assert_eq!(stack.len(), 100);
        assert_eq!(stack.iter().next().unwrap().item.key(), "k0");
    }
}
