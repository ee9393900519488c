// Extraction runner
//
// Owns the dispatch loop, the worker pool and the progress monitor of one run.
// Lifecycle: Created -> Running -> Draining -> Stopped. The only way to stop a
// healthy run is a SHUTDOWN message on the work channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use nlpworker_core::{DocumentSource, MessageBus, Pipeline};

use crate::config::RunnerConfig;
use crate::dispatch::DispatchLoop;
use crate::error::{Result, RunnerError};
use crate::events::{self, RunnerEvent};
use crate::intake::intake;
use crate::pool::{WorkerPool, WorkerShared};
use crate::progress::{ProgressMonitor, ProgressState};

/// Runner lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerStatus {
    /// Constructed, not subscribed yet
    Created,
    /// Subscribed, workers accepting work
    Running,
    /// SHUTDOWN received, queued work finishing
    Draining,
    /// Every worker exited
    Stopped,
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerStatus::Created => write!(f, "created"),
            RunnerStatus::Running => write!(f, "running"),
            RunnerStatus::Draining => write!(f, "draining"),
            RunnerStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    /// Units processed successfully
    pub processed: u64,
    /// Units that failed (lookup miss, pipeline error)
    pub failed: u64,
    /// Malformed messages ignored
    pub dropped: u64,
    pub progress: ProgressState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn ratio(&self) -> f64 {
        self.progress.ratio()
    }
}

/// Bus-driven extraction runner
pub struct ExtractionRunner {
    config: RunnerConfig,
    bus: Arc<dyn MessageBus>,
    pipeline: Arc<dyn Pipeline>,
    source: Arc<dyn DocumentSource>,
    monitor: Arc<ProgressMonitor>,
    status: Arc<watch::Sender<RunnerStatus>>,
    events: broadcast::Sender<RunnerEvent>,
    dropped: Arc<AtomicU64>,
    started: AtomicBool,
}

impl ExtractionRunner {
    pub fn new(
        config: RunnerConfig,
        bus: Arc<dyn MessageBus>,
        pipeline: Arc<dyn Pipeline>,
        source: Arc<dyn DocumentSource>,
    ) -> Self {
        let (status, _) = watch::channel(RunnerStatus::Created);
        Self {
            config,
            bus,
            pipeline,
            source,
            monitor: Arc::new(ProgressMonitor::new()),
            status: Arc::new(status),
            events: events::channel(),
            dropped: Arc::new(AtomicU64::new(0)),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn status(&self) -> RunnerStatus {
        *self.status.borrow()
    }

    /// processed / expected; -1 before any INIT_MONITORING
    pub fn progress_rate(&self) -> f64 {
        self.monitor.ratio()
    }

    pub fn progress(&self) -> ProgressState {
        self.monitor.snapshot()
    }

    /// Subscribe to lifecycle events
    pub fn events(&self) -> broadcast::Receiver<RunnerEvent> {
        self.events.subscribe()
    }

    /// Run on a background task
    pub fn start(self) -> RunnerHandle {
        let status = self.status.subscribe();
        let monitor = self.monitor.clone();
        let events = self.events.clone();
        let join = tokio::spawn(async move { self.run().await });
        RunnerHandle {
            status,
            monitor,
            events,
            join,
        }
    }

    /// Run until SHUTDOWN has drained every worker
    ///
    /// Fails when the subscription cannot be established or the bus goes away
    /// before SHUTDOWN. Per-document failures are counted, not returned.
    #[instrument(
        skip(self),
        fields(
            run_id = %self.config.run_id,
            channel = %self.config.channel,
            parallelism = self.config.parallelism,
        )
    )]
    pub async fn run(&self) -> Result<RunSummary> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RunnerError::AlreadyStarted);
        }
        let started_at = Utc::now();

        let stream = match self.bus.subscribe(&self.config.channel).await {
            Ok(stream) => stream,
            Err(source) => {
                error!(error = %source, "Subscription failed");
                self.status.send_replace(RunnerStatus::Stopped);
                events::emit(&self.events, RunnerEvent::Stopped);
                return Err(RunnerError::Subscribe {
                    channel: self.config.channel.clone(),
                    source,
                });
            }
        };

        self.preload().await;

        let (intake_tx, intake_rx) = intake(self.config.queue_capacity);
        let shared = Arc::new(WorkerShared {
            pipeline: self.pipeline.clone(),
            source: self.source.clone(),
            bus: self.bus.clone(),
            monitor: self.monitor.clone(),
            events: self.events.clone(),
            results_channel: self.config.results_channel.clone(),
            failed: AtomicU64::new(0),
        });
        let pool = WorkerPool::spawn(self.config.parallelism, intake_rx, shared.clone());

        if let Some(on_ready) = self.config.on_ready() {
            on_ready();
        }
        self.status.send_replace(RunnerStatus::Running);
        events::emit(&self.events, RunnerEvent::Ready);
        info!(user = %self.config.user, "Runner ready");

        let dispatch = DispatchLoop {
            parallelism: self.config.parallelism,
            default_index: self.config.user.default_index(),
            intake: intake_tx,
            monitor: self.monitor.clone(),
            status: self.status.clone(),
            events: self.events.clone(),
            dropped: self.dropped.clone(),
        };
        let outcome = dispatch.run(stream).await;

        pool.join().await;
        self.status.send_replace(RunnerStatus::Stopped);
        events::emit(&self.events, RunnerEvent::Stopped);

        let progress = self.monitor.snapshot();
        let summary = RunSummary {
            run_id: self.config.run_id.clone(),
            processed: progress.processed,
            failed: shared.failed.load(Ordering::Acquire),
            dropped: self.dropped.load(Ordering::Acquire),
            progress,
            started_at,
            finished_at: Utc::now(),
        };

        match outcome {
            Ok(()) => {
                info!(
                    processed = summary.processed,
                    failed = summary.failed,
                    dropped = summary.dropped,
                    ratio = summary.ratio(),
                    "Runner stopped"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(
                    error = %e,
                    processed = summary.processed,
                    failed = summary.failed,
                    "Runner stopped on error"
                );
                Err(e)
            }
        }
    }

    async fn preload(&self) {
        for &language in &self.config.preload_languages {
            match self.pipeline.initialize(language).await {
                Ok(true) => info!(%language, "Pipeline preloaded"),
                Ok(false) => warn!(%language, "Pipeline does not support preload language"),
                Err(e) => warn!(%language, error = %e, "Pipeline preload failed"),
            }
        }
    }
}

/// Handle on a runner started with [`ExtractionRunner::start`]
pub struct RunnerHandle {
    status: watch::Receiver<RunnerStatus>,
    monitor: Arc<ProgressMonitor>,
    events: broadcast::Sender<RunnerEvent>,
    join: JoinHandle<Result<RunSummary>>,
}

impl RunnerHandle {
    pub fn status(&self) -> RunnerStatus {
        *self.status.borrow()
    }

    /// Wait until the runner left `Created`
    ///
    /// Returns `Running` once work may be published, or `Stopped` when the
    /// subscription failed.
    pub async fn wait_ready(&self) -> RunnerStatus {
        let mut status = self.status.clone();
        let ready = match status.wait_for(|s| *s != RunnerStatus::Created).await {
            Ok(current) => *current,
            Err(_) => RunnerStatus::Stopped,
        };
        ready
    }

    pub fn progress_rate(&self) -> f64 {
        self.monitor.ratio()
    }

    pub fn progress(&self) -> ProgressState {
        self.monitor.snapshot()
    }

    pub fn events(&self) -> broadcast::Receiver<RunnerEvent> {
        self.events.subscribe()
    }

    /// Wait for the run to finish
    pub async fn wait(self) -> Result<RunSummary> {
        self.join
            .await
            .map_err(|e| RunnerError::Panicked(e.to_string()))?
    }
}
