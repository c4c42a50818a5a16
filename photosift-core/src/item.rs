//! Item record
//!
//! One photograph flowing through the carousel together with its derived
//! metadata. The key and path never change; `payload` and `score` are filled
//! lazily, either by the background worker or by an inline fallback.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::remote::RemoteItem;

/// Decoded pixel buffer, shared cheaply between the worker and the caller
pub type Payload = Arc<DynamicImage>;

/// Item lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Part of the live sequence
    Active,
    /// Removed from the live sequence, recoverable through the undo stack
    Deleted,
}

/// Metadata attached to items that came from a remote source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMeta {
    /// Remote identifier
    pub id: String,
    /// Link to the item in the remote product (used for deletion export)
    pub product_url: String,
}

/// One photograph
#[derive(Debug, Clone)]
pub struct Item {
    key: String,
    path: PathBuf,
    lifecycle: Lifecycle,
    payload: Option<Payload>,
    score: Option<f64>,
    remote_meta: Option<RemoteMeta>,
}

impl Item {
    /// Create an active item backed by a local file
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            lifecycle: Lifecycle::Active,
            payload: None,
            score: None,
            remote_meta: None,
        }
    }

    /// Create an item for a remote entry already downloaded to `path`
    pub fn from_remote(remote: &RemoteItem, path: impl Into<PathBuf>) -> Self {
        let mut item = Self::new(remote.filename.clone(), path);
        item.remote_meta = Some(RemoteMeta {
            id: remote.id.clone(),
            product_url: remote.product_url.clone(),
        });
        item
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn remote_meta(&self) -> Option<&RemoteMeta> {
        self.remote_meta.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.payload.is_some()
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    pub(crate) fn set_payload(&mut self, payload: Payload) {
        self.payload = Some(payload);
    }

    pub(crate) fn clear_payload(&mut self) {
        self.payload = None;
    }

    /// Record a score unless one is already present
    ///
    /// Returns true when the score was stored.
    pub(crate) fn offer_score(&mut self, score: f64) -> bool {
        if self.score.is_some() {
            return false;
        }
        self.score = Some(score);
        true
    }

    /// Drop the score so it is recomputed on next access
    pub fn invalidate_score(&mut self) {
        self.score = None;
    }
}
