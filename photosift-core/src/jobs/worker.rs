//! Background Worker
//!
//! Single long-lived thread that pulls jobs from the [`JobQueue`] and executes
//! them one at a time.
//!
//! The worker only produces field values. It reports them as [`Completion`]
//! messages; the interactive side applies them to the item store. Keys are
//! never added, removed, or reordered from this thread. Remote downloads are
//! handed back as whole items for the caller to append.
//!
//! States: `Running → Draining → Stopped`. Draining covers the short span
//! between dequeuing the shutdown sentinel and the thread exiting; every job
//! ordered ahead of the sentinel has already run by then, and nothing after
//! it will.

use super::liveness::{LiveEntry, Liveness};
use super::queue::JobQueue;
use super::types::{Completion, Job, JobKind};
use crate::codec::ImageCodec;
use crate::error::{Error, Result};
use crate::item::Item;
use crate::remote::RemoteSource;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// Shutdown sentinel taken; no further job will be executed
    Draining,
    /// Thread has left its loop
    Stopped,
}

/// Everything the worker thread owns
pub struct WorkerSetup {
    pub codec: Arc<dyn ImageCodec>,
    pub liveness: Liveness,
    pub remote: Option<Box<dyn RemoteSource>>,
    /// Where downloaded remote items are stored
    pub download_dir: PathBuf,
    pub auto_score: bool,
    pub completions: Sender<Completion>,
}

/// Handle to the background worker thread
pub struct Worker {
    queue: Arc<JobQueue>,
    state: Arc<Mutex<WorkerState>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start the worker thread
    pub fn spawn(queue: Arc<JobQueue>, setup: WorkerSetup) -> Result<Self> {
        let state = Arc::new(Mutex::new(WorkerState::Running));

        let queue_clone = Arc::clone(&queue);
        let state_clone = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name("photosift-worker".to_string())
            .spawn(move || {
                Self::worker_loop(queue_clone, state_clone, WorkerContext::new(setup));
            })?;

        info!("Background worker started");

        Ok(Self {
            queue,
            state,
            thread: Some(handle),
        })
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(state: &Mutex<WorkerState>, value: WorkerState) {
        *state.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Worker thread main loop
    fn worker_loop(queue: Arc<JobQueue>, state: Arc<Mutex<WorkerState>>, mut ctx: WorkerContext) {
        debug!("Background worker loop entered");

        loop {
            let job = queue.dequeue();

            if job.kind == JobKind::Shutdown {
                Self::set_state(&state, WorkerState::Draining);
                debug!("Background worker received shutdown job");
                queue.finish();
                break;
            }

            let started = Instant::now();
            ctx.execute(&job);
            debug!(
                "Job {:?} {:?} (priority={}) took {:.1}ms",
                job.kind,
                job.target,
                job.priority,
                started.elapsed().as_secs_f64() * 1000.0
            );
            queue.finish();
        }

        Self::set_state(&state, WorkerState::Stopped);
        debug!("Background worker exiting");
    }

    /// Enqueue the shutdown sentinel and wait for the thread to exit
    ///
    /// Jobs queued with a priority number at or below the sentinel's (and
    /// enqueued before it) still run first.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.thread.take() else {
            return Ok(());
        };

        info!("Shutting down background worker");
        self.queue.enqueue(Job::shutdown());

        handle.join().map_err(|e| {
            error!("Background worker join failed: {:?}", e);
            Error::WorkerStopped
        })?;

        info!("Background worker shut down");
        Ok(())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Worker shutdown on drop failed: {}", e);
        }
    }
}

/// State private to the worker thread
struct WorkerContext {
    codec: Arc<dyn ImageCodec>,
    liveness: Liveness,
    remote: Option<Box<dyn RemoteSource>>,
    download_dir: PathBuf,
    auto_score: bool,
    completions: Sender<Completion>,
    /// Liveness epoch at which this thread scored each key (the caller may
    /// not have drained the result yet)
    scored: HashMap<String, u64>,
}

impl WorkerContext {
    fn new(setup: WorkerSetup) -> Self {
        Self {
            codec: setup.codec,
            liveness: setup.liveness,
            remote: setup.remote,
            download_dir: setup.download_dir,
            auto_score: setup.auto_score,
            completions: setup.completions,
            scored: HashMap::new(),
        }
    }

    fn report(&self, completion: Completion) {
        // Receiver gone means the engine is shutting down
        let _ = self.completions.send(completion);
    }

    fn execute(&mut self, job: &Job) {
        match job.kind {
            JobKind::Load => self.with_target(job, Self::load),
            JobKind::Score => self.with_target(job, Self::score),
            JobKind::Evict => self.with_target(job, Self::evict),
            JobKind::Download => self.download(),
            JobKind::Shutdown => {}
        }
    }

    /// Resolve a job's target; stale targets are dropped silently
    fn with_target(&mut self, job: &Job, action: fn(&mut Self, &str, LiveEntry)) {
        let Some(key) = job.target.as_deref() else {
            warn!("{:?} job without target ignored", job.kind);
            return;
        };

        match self.liveness.lookup(key) {
            Some(entry) => action(self, key, entry),
            None => debug!("Dropping stale {:?} job for {}", job.kind, key),
        }
    }

    /// Scored according to the caller, or by this thread in the current epoch
    fn already_scored(&self, key: &str, entry: &LiveEntry) -> bool {
        entry.scored || self.scored.get(key) == Some(&entry.epoch)
    }

    fn load(&mut self, key: &str, entry: LiveEntry) {
        let already_scored = self.already_scored(key, &entry);
        let payload = match self.codec.decode(&entry.path) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Background decode failed for {}: {}", key, e);
                return;
            }
        };

        let score = if self.auto_score && !already_scored {
            self.scored.insert(key.to_string(), entry.epoch);
            Some(self.codec.score(&payload))
        } else {
            None
        };

        self.report(Completion::Loaded {
            key: key.to_string(),
            payload,
            score,
        });
    }

    fn score(&mut self, key: &str, entry: LiveEntry) {
        if self.already_scored(key, &entry) {
            return;
        }

        match self.codec.decode(&entry.path) {
            Ok(payload) => {
                let score = self.codec.score(&payload);
                self.scored.insert(key.to_string(), entry.epoch);
                self.report(Completion::Scored {
                    key: key.to_string(),
                    score,
                });
            }
            Err(e) => warn!("Background score failed for {}: {}", key, e),
        }
    }

    fn evict(&mut self, key: &str, _entry: LiveEntry) {
        self.report(Completion::Evicted {
            key: key.to_string(),
        });
    }

    fn download(&mut self) {
        let Some(remote) = self.remote.as_mut() else {
            warn!("Download job ignored: no remote source attached");
            return;
        };

        let remote_item = match remote.get_next() {
            Ok(item) => item,
            Err(Error::Exhausted) => {
                info!("Remote source exhausted");
                self.report(Completion::SourceExhausted);
                return;
            }
            Err(e) => {
                warn!("Remote fetch failed: {}", e);
                return;
            }
        };

        let path = match remote.download(&remote_item, &self.download_dir) {
            Ok(path) => path,
            Err(e) => {
                warn!("Download of {} failed: {}", remote_item.filename, e);
                return;
            }
        };

        debug!("Downloaded {} to {}", remote_item.filename, path.display());

        let mut item = Item::from_remote(&remote_item, path);
        match self.codec.decode(item.path()) {
            Ok(payload) => {
                if self.auto_score {
                    item.offer_score(self.codec.score(&payload));
                }
                item.set_payload(payload);
            }
            Err(e) => warn!("Decode of downloaded {} failed: {}", item.key(), e),
        }

        self.report(Completion::Downloaded { item });
    }
}
