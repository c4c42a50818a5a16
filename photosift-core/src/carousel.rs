//! Carousel engine
//!
//! Owns the ordered sequence of live keys, the cursor, the item store and the
//! undo history. Every navigation or mutation computes the O(1) set of jobs
//! needed to keep the neighbourhood of the cursor decoded and hands them to
//! the background worker.
//!
//! Worker results arrive as [`Completion`] messages and are applied by
//! [`Carousel::sync`], which every public operation calls first. Reads fall
//! back to an inline decode when the worker has not reached an item yet.

use crate::codec::ImageCodec;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::item::{Item, Lifecycle, RemoteMeta};
use crate::jobs::{
    Completion, Job, JobQueue, Liveness, Worker, WorkerSetup, WorkerState, DOWNLOAD_PRIORITY,
    NAVIGATION_PRIORITY,
};
use crate::quarantine::{FsQuarantine, Quarantine};
use crate::remote::RemoteSource;
use crate::scan;
use crate::store::ItemStore;
use crate::undo::{UndoEntry, UndoStack};
use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of remote items fetched synchronously at startup
pub const INITIAL_REMOTE_BATCH: usize = 10;

/// Queue, worker and the receiving end of its completion channel
struct Background {
    queue: Arc<JobQueue>,
    worker: Option<Worker>,
    completions: Receiver<Completion>,
}

/// Remote source status as seen from the interactive side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteStatus {
    Off,
    Active,
    Exhausted,
}

/// Sliding-window engine over an ordered photo collection
pub struct Carousel {
    config: EngineConfig,
    sequence: Vec<String>,
    cursor: usize,
    store: ItemStore,
    undo: UndoStack,
    liveness: Liveness,
    codec: Arc<dyn ImageCodec>,
    quarantine: Box<dyn Quarantine>,
    background: Option<Background>,
    remote: RemoteStatus,
    /// Deleted items that fell off the undo history
    discarded: Vec<Option<RemoteMeta>>,
}

impl Carousel {
    /// Open every photograph in `dir`
    ///
    /// Fails when the directory cannot be read or the `deleted` folder cannot
    /// be created; no engine is constructed in that case.
    pub fn open_local(dir: &Path, config: EngineConfig, codec: Arc<dyn ImageCodec>) -> Result<Self> {
        let keys = scan::list_images(dir)?;
        let quarantine = FsQuarantine::create(dir)?;

        let items = keys
            .into_iter()
            .map(|key| {
                let path = dir.join(&key);
                Item::new(key, path)
            })
            .collect();

        Self::new(items, dir, config, codec, Box::new(quarantine), None)
    }

    /// Start a session over a remote source, downloading into `dir`
    ///
    /// The first batch is fetched and downloaded synchronously; later items
    /// are pulled by the worker as navigation nears the right edge.
    pub fn open_remote(
        dir: &Path,
        mut source: Box<dyn RemoteSource>,
        config: EngineConfig,
        codec: Arc<dyn ImageCodec>,
    ) -> Result<Self> {
        if !config.background {
            return Err(Error::Config(
                "Remote mode cannot run without background loading".to_string(),
            ));
        }

        fs::create_dir_all(dir)?;
        let quarantine = FsQuarantine::create(dir)?;

        let batch = source.get_multiple(INITIAL_REMOTE_BATCH)?;
        let mut items = Vec::with_capacity(batch.len());
        for remote_item in &batch {
            let path = source.download(remote_item, dir)?;
            items.push(Item::from_remote(remote_item, path));
        }
        info!("Fetched initial batch of {} remote items", items.len());

        Self::new(items, dir, config, codec, Box::new(quarantine), Some(source))
    }

    /// Build an engine from explicit collaborators
    ///
    /// Items with a key already seen are skipped.
    pub fn new(
        items: Vec<Item>,
        download_dir: &Path,
        config: EngineConfig,
        codec: Arc<dyn ImageCodec>,
        quarantine: Box<dyn Quarantine>,
        remote: Option<Box<dyn RemoteSource>>,
    ) -> Result<Self> {
        Self::assemble(items, download_dir, config, codec, quarantine, remote, true)
    }

    fn assemble(
        items: Vec<Item>,
        download_dir: &Path,
        config: EngineConfig,
        codec: Arc<dyn ImageCodec>,
        quarantine: Box<dyn Quarantine>,
        remote: Option<Box<dyn RemoteSource>>,
        spawn_worker: bool,
    ) -> Result<Self> {
        if remote.is_some() && !config.background {
            return Err(Error::Config(
                "A remote source requires background loading".to_string(),
            ));
        }

        let liveness = Liveness::new();
        let mut store = ItemStore::new();
        let mut sequence = Vec::with_capacity(items.len());

        for item in items {
            let key = item.key().to_string();
            let path = item.path().to_path_buf();
            let scored = item.score().is_some();
            if store.insert(item) {
                liveness.insert(&key, path, scored);
                sequence.push(key);
            } else {
                warn!("Duplicate key {} skipped", key);
            }
        }

        let remote_status = if remote.is_some() {
            RemoteStatus::Active
        } else {
            RemoteStatus::Off
        };

        let background = if config.background {
            let queue = Arc::new(JobQueue::new());
            let (tx, rx) = mpsc::channel();
            let worker = if spawn_worker {
                Some(Worker::spawn(
                    Arc::clone(&queue),
                    WorkerSetup {
                        codec: Arc::clone(&codec),
                        liveness: liveness.clone(),
                        remote,
                        download_dir: download_dir.to_path_buf(),
                        auto_score: config.auto_score,
                        completions: tx,
                    },
                )?)
            } else {
                None
            };
            Some(Background {
                queue,
                worker,
                completions: rx,
            })
        } else {
            None
        };

        let carousel = Self {
            undo: UndoStack::new(config.undo_capacity),
            config,
            sequence,
            cursor: 0,
            store,
            liveness,
            codec,
            quarantine,
            background,
            remote: remote_status,
            discarded: Vec::new(),
        };

        carousel.enqueue_startup_jobs();

        info!(
            "Carousel ready: {} items (background={}, remote={})",
            carousel.len(),
            carousel.background.is_some(),
            carousel.remote != RemoteStatus::Off
        );

        Ok(carousel)
    }

    /// Bulk scoring pass (least urgent, in collection order) plus loads for
    /// the initial window (most urgent first)
    fn enqueue_startup_jobs(&self) {
        let Some(bg) = &self.background else {
            return;
        };

        let len = self.sequence.len();
        if self.remote == RemoteStatus::Off {
            for (i, key) in self.sequence.iter().enumerate() {
                bg.queue.enqueue(Job::score(key.clone(), (len + i) as u64));
            }
        }

        let initial = self.config.preload_range.saturating_add(1).min(len);
        for (i, key) in self.sequence.iter().take(initial).enumerate() {
            bg.queue.enqueue(Job::load(key.clone(), i as u64));
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Live keys in display order
    pub fn keys(&self) -> &[String] {
        &self.sequence
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of restorable deletions
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_remote(&self) -> bool {
        self.remote != RemoteStatus::Off
    }

    /// Keys whose payload is currently held (after applying pending results)
    pub fn loaded_keys(&mut self) -> Vec<String> {
        self.sync();
        self.store.loaded_keys()
    }

    /// Queued background jobs in execution order (diagnostics)
    pub fn pending_jobs(&self) -> Vec<Job> {
        self.background
            .as_ref()
            .map(|bg| bg.queue.pending())
            .unwrap_or_default()
    }

    pub fn worker_state(&self) -> Option<WorkerState> {
        self.background
            .as_ref()
            .and_then(|bg| bg.worker.as_ref())
            .map(Worker::state)
    }

    // ========================================================================
    // Worker results
    // ========================================================================

    /// Apply every result the worker has reported so far
    pub fn sync(&mut self) {
        let Some(bg) = &self.background else {
            return;
        };
        let completions: Vec<Completion> = bg.completions.try_iter().collect();
        for completion in completions {
            self.apply(completion);
        }
    }

    /// Block until the worker has nothing queued or running, then sync
    ///
    /// Returns false on timeout.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let idle = match &self.background {
            Some(bg) => bg.queue.wait_idle(timeout),
            None => true,
        };
        self.sync();
        idle
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Loaded {
                key,
                payload,
                score,
            } => match self.store.get_mut(&key) {
                Some(item) => {
                    item.set_payload(payload);
                    if let Some(score) = score {
                        if item.offer_score(score) {
                            self.liveness.mark_scored(&key);
                        }
                    }
                }
                None => debug!("Discarding load result for {}", key),
            },
            Completion::Scored { key, score } => match self.store.get_mut(&key) {
                Some(item) => {
                    if item.offer_score(score) {
                        self.liveness.mark_scored(&key);
                    }
                }
                None => debug!("Discarding score for {}", key),
            },
            Completion::Evicted { key } => {
                self.store.evict(&key);
            }
            Completion::Downloaded { item } => self.append_remote(item),
            Completion::SourceExhausted => {
                if self.remote == RemoteStatus::Active {
                    self.remote = RemoteStatus::Exhausted;
                }
            }
        }
    }

    fn append_remote(&mut self, item: Item) {
        let key = item.key().to_string();
        if self.store.contains(&key) || self.undo.iter().any(|e| e.item.key() == key) {
            warn!("Remote item {} already known, skipped", key);
            return;
        }

        self.liveness
            .insert(&key, item.path().to_path_buf(), item.score().is_some());
        self.store.insert(item);
        self.sequence.push(key.clone());
        debug!("Appended remote item {} at {}", key, self.sequence.len() - 1);
    }

    // ========================================================================
    // Job requests
    // ========================================================================

    fn request_load(&mut self, index: Option<usize>) {
        let Some(index) = index else {
            return;
        };
        let len = self.sequence.len();

        if let Some(bg) = &self.background {
            if index < len {
                debug!("Load requested for {}", index);
                bg.queue
                    .enqueue(Job::load(self.sequence[index].clone(), NAVIGATION_PRIORITY));
            }

            if self.remote == RemoteStatus::Active && index >= len.saturating_sub(1) {
                debug!("Download requested (index {} of {})", index, len);
                bg.queue.enqueue(Job::download(DOWNLOAD_PRIORITY));
            }
        }
    }

    fn request_evict(&mut self, index: Option<usize>) {
        let Some(key) = index.and_then(|i| self.sequence.get(i)).cloned() else {
            return;
        };

        match &self.background {
            Some(bg) => {
                debug!("Evict requested for {}", key);
                bg.queue.enqueue(Job::evict(key, NAVIGATION_PRIORITY));
            }
            None => {
                self.store.evict(&key);
            }
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Move the cursor one item to the right
    ///
    /// Returns false (and does nothing) at the last item.
    pub fn move_next(&mut self) -> bool {
        self.sync();
        if self.cursor + 1 >= self.sequence.len() {
            return false;
        }

        self.cursor += 1;
        let range = self.config.preload_range;
        let entering = self.cursor.checked_add(range);
        let leaving = trailing_span(range).and_then(|span| self.cursor.checked_sub(span));
        self.request_load(entering);
        self.request_evict(leaving);
        true
    }

    /// Move the cursor one item to the left
    ///
    /// Returns false (and does nothing) at the first item.
    pub fn move_previous(&mut self) -> bool {
        self.sync();
        if self.cursor == 0 {
            return false;
        }

        self.cursor -= 1;
        let range = self.config.preload_range;
        let entering = self.cursor.checked_sub(range);
        let leaving = trailing_span(range).and_then(|span| self.cursor.checked_add(span));
        self.request_load(entering);
        self.request_evict(leaving);
        true
    }

    // ========================================================================
    // Reads
    // ========================================================================

    fn fill(&mut self, key: &str) {
        if let Some(outcome) = self.store.fill(key, self.codec.as_ref()) {
            if outcome.scored {
                self.liveness.mark_scored(key);
            }
        }
    }

    /// Live item by key, decoding and scoring inline when needed
    pub fn get(&mut self, key: &str) -> Result<&Item> {
        self.sync();
        if !self.store.contains(key) {
            return Err(Error::NotFound(key.to_string()));
        }
        self.fill(key);
        self.store
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    /// Item at `cursor + offset`
    pub fn relative(&mut self, offset: usize) -> Result<&Item> {
        let key = self
            .cursor
            .checked_add(offset)
            .and_then(|index| self.sequence.get(index))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("offset {offset} from cursor")))?;
        self.get(&key)
    }

    /// Up to `n` consecutive items starting at the cursor
    ///
    /// Shorter at the end of the sequence; never fails. Items whose decode
    /// failed are returned without payload.
    pub fn window(&mut self, n: usize) -> Vec<&Item> {
        self.sync();
        let start = self.cursor.min(self.sequence.len());
        let end = self.cursor.saturating_add(n).min(self.sequence.len());
        let keys: Vec<String> = self.sequence[start..end].to_vec();

        for key in &keys {
            self.fill(key);
        }

        keys.iter().filter_map(|key| self.store.get(key)).collect()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Soft-delete the item at `cursor + offset`
    ///
    /// Deleting in the left half of the window moves the cursor left so the
    /// remaining items keep their on-screen place. Returns the deleted key,
    /// or None when the offset is out of range.
    pub fn delete(&mut self, offset: usize, window_size: usize) -> Result<Option<String>> {
        self.sync();
        let Some(index) = self.cursor.checked_add(offset) else {
            return Ok(None);
        };
        let Some(key) = self.sequence.get(index).cloned() else {
            return Ok(None);
        };

        let mut item = self
            .store
            .remove(&key)
            .ok_or_else(|| Error::Internal(format!("live key {key} missing from store")))?;

        if let Err(e) = self.quarantine.soft_delete(&item) {
            self.store.insert(item);
            return Err(e);
        }

        self.sequence.remove(index);
        self.liveness.remove(&key);
        item.set_lifecycle(Lifecycle::Deleted);
        item.clear_payload();

        let range = self.config.preload_range;
        let cursor_shifted = self.cursor > 0 && offset < window_size.div_ceil(2);
        if cursor_shifted {
            self.cursor -= 1;
            let far_left = self.cursor.checked_sub(range);
            self.request_load(far_left);
        } else {
            self.request_load(self.cursor.checked_add(range));
        }
        self.clamp_cursor();

        info!("Deleted {} (position {})", key, index);

        if let Some(dropped) = self.undo.push(UndoEntry {
            position: index,
            item,
            cursor_shifted,
        }) {
            debug!(
                "Undo history full, {} can no longer be restored",
                dropped.item.key()
            );
            self.discarded.push(dropped.item.remote_meta().cloned());
        }

        Ok(Some(key))
    }

    /// Delete whichever of the two displayed items scores lower
    ///
    /// Only acts on a two-item window. Nothing happens when the scores differ
    /// by less than `threshold` or either score is unavailable.
    pub fn delete_blurrier(&mut self, threshold: f64, window_size: usize) -> Result<Option<String>> {
        if window_size != 2 || self.cursor + 1 >= self.sequence.len() {
            return Ok(None);
        }

        let left = self.relative(0)?.score();
        let right = self.relative(1)?.score();
        let (Some(left), Some(right)) = (left, right) else {
            warn!("Cannot compare focus: score unavailable");
            return Ok(None);
        };

        let difference = left - right;
        if difference.abs() < threshold {
            debug!("Focus difference {:.2} below threshold {:.2}", difference, threshold);
            return Ok(None);
        }

        let offset = usize::from(difference > 0.0);
        self.delete(offset, window_size)
    }

    /// Undo the most recent deletion
    ///
    /// Returns the restored key, or None when there is nothing to restore.
    pub fn restore_last(&mut self) -> Result<Option<String>> {
        self.sync();
        let Some(entry) = self.undo.pop() else {
            debug!("Nothing to restore");
            return Ok(None);
        };

        let key = entry.item.key().to_string();
        if self.store.contains(&key) {
            self.undo.push(entry);
            return Err(Error::Internal(format!("{key} is already live")));
        }

        if let Err(e) = self.quarantine.restore(&entry.item) {
            self.undo.push(entry);
            return Err(e);
        }

        let UndoEntry {
            position,
            mut item,
            cursor_shifted,
        } = entry;

        let was_empty = self.sequence.is_empty();
        let position = position.min(self.sequence.len());
        item.set_lifecycle(Lifecycle::Active);
        self.liveness
            .insert(&key, item.path().to_path_buf(), item.score().is_some());
        self.sequence.insert(position, key.clone());
        self.store.insert(item);

        if cursor_shifted && !was_empty {
            self.cursor += 1;
        }
        self.clamp_cursor();

        info!("Restored {} at position {}", key, position);
        Ok(Some(key))
    }

    /// Forget the score of `key`; it is recomputed on next access
    pub fn invalidate_score(&mut self, key: &str) -> Result<()> {
        self.sync();
        let item = self
            .store
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        item.invalidate_score();
        self.liveness.invalidate_score(key);
        Ok(())
    }

    /// Swap two items of the current window
    ///
    /// Both offsets must lie in `[0, window_size)` and inside the sequence.
    pub fn swap(&mut self, first: usize, second: usize, window_size: usize) -> bool {
        if first >= window_size || second >= window_size {
            return false;
        }
        let (Some(a), Some(b)) = (self.cursor.checked_add(first), self.cursor.checked_add(second))
        else {
            return false;
        };
        if a >= self.sequence.len() || b >= self.sequence.len() {
            return false;
        }
        self.sequence.swap(a, b);
        true
    }

    fn clamp_cursor(&mut self) {
        if self.sequence.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.sequence.len() {
            self.cursor = self.sequence.len() - 1;
        }
    }

    // ========================================================================
    // Session end
    // ========================================================================

    /// Product URLs of every item deleted this session (restorable or not)
    pub fn deleted_product_urls(&self) -> Vec<String> {
        self.discarded
            .iter()
            .flatten()
            .chain(self.undo.iter().filter_map(|e| e.item.remote_meta()))
            .map(|meta| meta.product_url.clone())
            .collect()
    }

    /// Number of deletions no longer restorable
    pub fn discarded_count(&self) -> usize {
        self.discarded.len()
    }

    /// Stop the worker (blocking until it processed the shutdown job) and
    /// apply its remaining results
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(worker) = self.background.as_mut().and_then(|bg| bg.worker.as_mut()) {
            worker.shutdown()?;
        }
        self.sync();
        Ok(())
    }
}

/// Distance from the cursor to the item that leaves the decoded
/// neighbourhood on a move (`2 * range + 1`); None when it cannot be
/// represented
fn trailing_span(range: usize) -> Option<usize> {
    range.checked_mul(2)?.checked_add(1)
}
