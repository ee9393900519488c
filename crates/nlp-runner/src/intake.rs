// Intake queue between the dispatch loop and the workers
//
// Decision: One bounded mpsc channel; workers share the receiver behind an async
// mutex so claims are FIFO and each item goes to exactly one worker.
// Decision: Termination tokens travel through the same queue, so every unit
// accepted before SHUTDOWN is claimed before any worker stops.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use nlpworker_core::WorkUnit;

use crate::error::{Result, RunnerError};

/// Item carried by the intake queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeItem {
    /// Extract one document
    Work(WorkUnit),
    /// The claiming worker stops
    Terminate,
}

/// Create a bounded intake queue
pub fn intake(capacity: usize) -> (IntakeSender, IntakeReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        IntakeSender { tx },
        IntakeReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side, owned by the dispatch loop
#[derive(Debug)]
pub struct IntakeSender {
    tx: mpsc::Sender<IntakeItem>,
}

impl IntakeSender {
    /// Enqueue a unit; waits while the queue is full
    pub async fn submit(&self, unit: WorkUnit) -> Result<()> {
        self.tx
            .send(IntakeItem::Work(unit))
            .await
            .map_err(|_| RunnerError::WorkersGone)
    }

    /// Enqueue `count` termination tokens behind the pending work
    pub async fn terminate(&self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.tx
                .send(IntakeItem::Terminate)
                .await
                .map_err(|_| RunnerError::WorkersGone)?;
        }
        Ok(())
    }
}

/// Consumer side, cloned into every worker
#[derive(Debug, Clone)]
pub struct IntakeReceiver {
    rx: Arc<Mutex<mpsc::Receiver<IntakeItem>>>,
}

impl IntakeReceiver {
    /// Claim the oldest item
    ///
    /// Returns `None` once the sender is dropped and the queue is empty.
    pub async fn claim(&self) -> Option<IntakeItem> {
        self.rx.lock().await.recv().await
    }
}
