//! Priority Job Queue
//!
//! Thread-safe min-priority queue. Ordering is (priority, sequence number):
//! the sequence number is assigned at enqueue time so equal priorities come
//! out in the order they went in.
//!
//! The queue also counts jobs handed out but not yet reported finished, which
//! lets callers wait until the worker is idle.

use super::types::Job;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Job plus its tie-breaking sequence number
#[derive(Debug)]
struct QueuedJob {
    seq: u64,
    job: Job,
}

impl QueuedJob {
    fn sort_key(&self) -> (u64, u64) {
        (self.job.priority, self.seq)
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for QueuedJob {}

#[derive(Debug, Default)]
struct QueueState {
    heap: BinaryHeap<Reverse<QueuedJob>>,
    next_seq: u64,
    in_progress: usize,
}

/// Blocking, stable priority queue
#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    condvar: Condvar,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a job; never blocks beyond the internal lock
    pub fn enqueue(&self, job: Job) {
        {
            let mut state = self.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.heap.push(Reverse(QueuedJob { seq, job }));
        }
        self.condvar.notify_all();
    }

    /// Remove the most urgent job, blocking while the queue is empty
    ///
    /// The job counts as in progress until [`JobQueue::finish`] is called.
    pub fn dequeue(&self) -> Job {
        let mut state = self.lock();
        loop {
            if let Some(Reverse(queued)) = state.heap.pop() {
                state.in_progress += 1;
                return queued.job;
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Remove the most urgent job without blocking
    pub fn try_dequeue(&self) -> Option<Job> {
        let mut state = self.lock();
        let Reverse(queued) = state.heap.pop()?;
        state.in_progress += 1;
        Some(queued.job)
    }

    /// Report that a dequeued job has been fully handled
    pub fn finish(&self) {
        {
            let mut state = self.lock();
            state.in_progress = state.in_progress.saturating_sub(1);
        }
        self.condvar.notify_all();
    }

    /// Wait until no job is queued or in progress
    ///
    /// Returns false if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while !state.heap.is_empty() || state.in_progress > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .condvar
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Queued jobs (diagnostics)
    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queued jobs in the order they would be dequeued (diagnostics)
    pub fn pending(&self) -> Vec<Job> {
        let state = self.lock();
        let mut queued: Vec<&QueuedJob> = state.heap.iter().map(|Reverse(q)| q).collect();
        queued.sort();
        queued.into_iter().map(|q| q.job.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobKind;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lower_priority_number_first() {
        let queue = JobQueue::new();
        queue.enqueue(Job::score("c", 30));
        queue.enqueue(Job::load("a", 1));
        queue.enqueue(Job::evict("b", 5));

        assert_eq!(queue.dequeue().target.as_deref(), Some("a"));
        assert_eq!(queue.dequeue().target.as_deref(), Some("b"));
        assert_eq!(queue.dequeue().target.as_deref(), Some("c"));
        assert!(queue.try_dequeue().is_none());
    }

    #[test]
    fn test_equal_priority_is_fifo() {
        let queue = JobQueue::new();
        for key in ["first", "second", "third", "fourth"] {
            queue.enqueue(Job::load(key, 5));
        }
        let order: Vec<String> = (0..4).filter_map(|_| queue.dequeue().target).collect();
        assert_eq!(order, vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn test_shutdown_waits_behind_equal_priority() {
        let queue = JobQueue::new();
        queue.enqueue(Job::load("zero", 0));
        queue.enqueue(Job::score("late", 50));
        queue.enqueue(Job::shutdown());

        assert_eq!(queue.dequeue().target.as_deref(), Some("zero"));
        assert_eq!(queue.dequeue().kind, JobKind::Shutdown);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pending_matches_dequeue_order() {
        let queue = JobQueue::new();
        queue.enqueue(Job::load("x", 2));
        queue.enqueue(Job::load("y", 1));
        queue.enqueue(Job::load("z", 2));

        let pending: Vec<String> = queue.pending().into_iter().filter_map(|j| j.target).collect();
        assert_eq!(pending, vec!["y", "x", "z"]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_dequeue_blocks_until_enqueue() {
        let queue = Arc::new(JobQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue())
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue(Job::download(10));

        let job = consumer.join().unwrap();
        assert_eq!(job.kind, JobKind::Download);
    }

    #[test]
    fn test_wait_idle_tracks_in_progress() {
        let queue = JobQueue::new();
        assert!(queue.wait_idle(Duration::from_millis(1)));

        queue.enqueue(Job::load("a", 1));
        let _job = queue.dequeue();
        assert!(!queue.wait_idle(Duration::from_millis(10)));

        queue.finish();
        assert!(queue.wait_idle(Duration::from_millis(10)));
    }
}
