// Runner errors
//
// Per-unit failures never surface here: a worker logs them and moves on.
// These are the conditions that end a run.

use thiserror::Error;

use nlpworker_core::{Channel, CoreError};

/// Errors that stop an extraction run
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Subscribing to the work channel failed; no worker was started
    #[error("Failed to subscribe to channel {channel}: {source}")]
    Subscribe {
        channel: Channel,
        #[source]
        source: CoreError,
    },

    /// The bus reported a failure while the run was receiving
    #[error("Bus failure: {0}")]
    Bus(#[source] CoreError),

    /// The bus stream ended before a SHUTDOWN message arrived
    #[error("Bus closed before shutdown")]
    BusClosed,

    /// Every worker is gone; the intake queue cannot accept work
    #[error("No worker left to accept work")]
    WorkersGone,

    /// `run` was called on a runner that already ran
    #[error("Runner already started")]
    AlreadyStarted,

    /// The run task panicked
    #[error("Runner panicked: {0}")]
    Panicked(String),
}

impl RunnerError {
    /// True when the run ended because of the transport, not the runner
    pub fn is_bus_failure(&self) -> bool {
        matches!(
            self,
            RunnerError::Subscribe { .. } | RunnerError::Bus(_) | RunnerError::BusClosed
        )
    }
}

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;
