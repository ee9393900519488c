// NLP Extraction Runner
//
// Consumes NLP work from a message bus and fans it out to a fixed pool of
// workers that annotate documents with a shared pipeline.
//
// Components:
// - DispatchLoop: the single reader of the work channel, in arrival order
// - WorkerPool: `parallelism` tasks claiming from one bounded intake queue
// - ProgressMonitor: expected / processed counters, readable at any time
// - ExtractionRunner: composes the above and owns the lifecycle
//
// Shutdown is cooperative: SHUTDOWN appends one termination token per worker
// behind the queued work, so everything accepted before it is processed.

pub mod config;
mod dispatch;
pub mod error;
pub mod events;
pub mod intake;
mod pool;
pub mod progress;
pub mod runner;

pub use config::{RunnerConfig, DEFAULT_PARALLELISM, DEFAULT_QUEUE_CAPACITY};
pub use error::{Result, RunnerError};
pub use events::RunnerEvent;
pub use progress::{ProgressMonitor, ProgressState, PROGRESS_UNINITIALIZED};
pub use runner::{ExtractionRunner, RunSummary, RunnerHandle, RunnerStatus};
