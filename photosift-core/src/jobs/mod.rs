//! Background job machinery: priority queue, worker thread, and the types
//! passed between them

pub mod liveness;
pub mod queue;
pub mod types;
pub mod worker;

pub use liveness::Liveness;
pub use queue::JobQueue;
pub use types::{Completion, Job, JobKind, DOWNLOAD_PRIORITY, NAVIGATION_PRIORITY, SHUTDOWN_PRIORITY};
pub use worker::{Worker, WorkerSetup, WorkerState};
