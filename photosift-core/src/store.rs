//! Item Store
//!
//! Maps a stable key to its [`Item`]. Membership (insert/remove) is changed
//! only by the interactive side; payload and score are filled either from
//! worker completions or by the inline fallback in [`ItemStore::fill`].
//!
//! Decode failures are not cached: the payload stays absent and the next
//! access tries again.

use crate::codec::ImageCodec;
use crate::item::Item;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Outcome of an inline fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillOutcome {
    /// Payload was decoded on the calling thread
    pub decoded: bool,
    /// Score was computed on the calling thread
    pub scored: bool,
}

/// Key → Item map
#[derive(Debug, Default)]
pub struct ItemStore {
    items: HashMap<String, Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item; returns false (and leaves the store unchanged) when
    /// the key is already present
    pub fn insert(&mut self, item: Item) -> bool {
        if self.items.contains_key(item.key()) {
            return false;
        }
        self.items.insert(item.key().to_string(), item);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<Item> {
        self.items.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
        self.items.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys whose payload is currently present
    pub fn loaded_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .items
            .values()
            .filter(|item| item.is_loaded())
            .map(|item| item.key().to_string())
            .collect();
        keys.sort();
        keys
    }

    /// Clear the payload of `key`, keeping its score
    pub fn evict(&mut self, key: &str) -> bool {
        match self.items.get_mut(key) {
            Some(item) => {
                item.clear_payload();
                true
            }
            None => false,
        }
    }

    /// Make sure `key` has a payload and a score, computing them inline when
    /// absent
    ///
    /// Returns None when the key is unknown.
    pub fn fill(&mut self, key: &str, codec: &dyn ImageCodec) -> Option<FillOutcome> {
        let item = self.items.get_mut(key)?;
        let mut outcome = FillOutcome::default();

        if item.payload().is_none() {
            debug!("Inline decode: {}", key);
            match codec.decode(item.path()) {
                Ok(payload) => {
                    item.set_payload(payload);
                    outcome.decoded = true;
                }
                Err(e) => {
                    warn!("Failed to decode {}: {}", key, e);
                    return Some(outcome);
                }
            }
        }

        if item.score().is_none() {
            if let Some(payload) = item.payload().cloned() {
                outcome.scored = item.offer_score(codec.score(&payload));
            }
        }

        Some(outcome)
    }
}
