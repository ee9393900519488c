// Runner lifecycle events
//
// Broadcast to any number of observers. Slow observers lag and lose events;
// the run itself never waits on them.

use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something that happened during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunnerEvent {
    /// Subscribed and workers started; work may be published
    Ready,
    /// An INIT_MONITORING message raised the expected total
    MonitoringInitialized { added: u64, expected_total: u64 },
    /// A worker finished a unit
    UnitCompleted {
        worker: usize,
        document_id: String,
        entities: u64,
    },
    /// A worker gave up on a unit
    UnitFailed {
        worker: usize,
        document_id: String,
        error: String,
    },
    /// A bus message was malformed and ignored
    MessageDropped { reason: String },
    /// SHUTDOWN received; pending work is draining
    Draining,
    /// All workers stopped
    Stopped,
}

pub(crate) fn channel() -> broadcast::Sender<RunnerEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Send without caring whether anyone listens
pub(crate) fn emit(tx: &broadcast::Sender<RunnerEvent>, event: RunnerEvent) {
    let _ = tx.send(event);
}
