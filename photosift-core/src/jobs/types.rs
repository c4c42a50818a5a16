//! Job and completion types shared by the queue and the worker

use crate::item::{Item, Payload};

/// Priority used for loads and evictions triggered by navigation
///
/// Mid-range so interactive moves always preempt the bulk scoring pass,
/// which starts at the collection size.
pub const NAVIGATION_PRIORITY: u64 = 5;

/// Priority of remote downloads triggered near the right edge
pub const DOWNLOAD_PRIORITY: u64 = 10;

/// Priority of the shutdown sentinel (lowest number, still FIFO with ties)
pub const SHUTDOWN_PRIORITY: u64 = 0;

/// Kind of background work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Decode payload (and score it when auto-scoring is on)
    Load,
    /// Compute score only, payload is not kept
    Score,
    /// Pull the next item from the remote source
    Download,
    /// Clear payload, keep score
    Evict,
    /// Stop the worker loop
    Shutdown,
}

/// Unit of background work
///
/// Lower priority numbers execute sooner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub priority: u64,
    pub kind: JobKind,
    pub target: Option<String>,
}

impl Job {
    pub fn load(key: impl Into<String>, priority: u64) -> Self {
        Self::targeted(JobKind::Load, key, priority)
    }

    pub fn score(key: impl Into<String>, priority: u64) -> Self {
        Self::targeted(JobKind::Score, key, priority)
    }

    pub fn evict(key: impl Into<String>, priority: u64) -> Self {
        Self::targeted(JobKind::Evict, key, priority)
    }

    pub fn download(priority: u64) -> Self {
        Self {
            priority,
            kind: JobKind::Download,
            target: None,
        }
    }

    pub fn shutdown() -> Self {
        Self {
            priority: SHUTDOWN_PRIORITY,
            kind: JobKind::Shutdown,
            target: None,
        }
    }

    fn targeted(kind: JobKind, key: impl Into<String>, priority: u64) -> Self {
        Self {
            priority,
            kind,
            target: Some(key.into()),
        }
    }
}

/// Field update reported by the worker
///
/// The worker never touches the item store; the interactive side applies
/// these in arrival order before reading.
#[derive(Debug)]
pub enum Completion {
    /// Payload decoded, optionally with a score from the same pass
    Loaded {
        key: String,
        payload: Payload,
        score: Option<f64>,
    },
    /// Score computed from a transient decode
    Scored { key: String, score: f64 },
    /// Payload should be released
    Evicted { key: String },
    /// New remote item, downloaded and ready to append
    Downloaded { item: Item },
    /// Remote source has no more items
    SourceExhausted,
}
