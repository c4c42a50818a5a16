//! Live key registry
//!
//! Written only by the interactive side (insert on append/restore, remove on
//! delete, mark scored when a score lands, invalidate on request). The worker
//! reads it to resolve a job's target path and to drop jobs whose target is no
//! longer live.
//!
//! Every insert and invalidation stamps the entry with a fresh epoch. The
//! worker remembers the epoch at which it scored a key; a newer epoch means
//! that score no longer counts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Snapshot of one live key
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEntry {
    pub path: PathBuf,
    pub scored: bool,
    pub epoch: u64,
}

#[derive(Debug, Default)]
struct Registry {
    entries: HashMap<String, LiveEntry>,
    next_epoch: u64,
}

impl Registry {
    fn stamp(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }
}

/// Shared handle to the registry
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    inner: Arc<RwLock<Registry>>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, path: PathBuf, scored: bool) {
        let mut registry = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let epoch = registry.stamp();
        registry.entries.insert(
            key.to_string(),
            LiveEntry {
                path,
                scored,
                epoch,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .remove(key);
    }

    pub fn mark_scored(&self, key: &str) {
        if let Some(entry) = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get_mut(key)
        {
            entry.scored = true;
        }
    }

    /// Clear the scored flag and start a new epoch for `key`
    pub fn invalidate_score(&self, key: &str) {
        let mut registry = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let epoch = registry.stamp();
        if let Some(entry) = registry.entries.get_mut(key) {
            entry.scored = false;
            entry.epoch = epoch;
        }
    }

    pub fn lookup(&self, key: &str) -> Option<LiveEntry> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_starts_new_epoch() {
        let liveness = Liveness::new();
        liveness.insert("a.jpg", PathBuf::from("/p/a.jpg"), false);
        liveness.mark_scored("a.jpg");
        let before = liveness.lookup("a.jpg").unwrap();
        assert!(before.scored);

        liveness.invalidate_score("a.jpg");
        let after = liveness.lookup("a.jpg").unwrap();
        assert!(!after.scored);
        assert!(after.epoch > before.epoch);

        // Unknown keys are ignored
        liveness.invalidate_score("b.jpg");
        assert!(!liveness.contains("b.jpg"));
    }

    #[test]
    fn test_reinsert_gets_fresh_epoch() {
        let liveness = Liveness::new();
        liveness.insert("a.jpg", PathBuf::from("/p/a.jpg"), true);
        let first = liveness.lookup("a.jpg").unwrap().epoch;
        liveness.remove("a.jpg");
        liveness.insert("a.jpg", PathBuf::from("/p/a.jpg"), false);
        assert!(liveness.lookup("a.jpg").unwrap().epoch > first);
    }
}
