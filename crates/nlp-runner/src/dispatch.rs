// Dispatch loop
//
// The single reader of the work channel. Messages are handled strictly in
// arrival order: work goes to the intake queue (waiting when it is full),
// monitoring totals go to the progress monitor, SHUTDOWN queues one
// termination token per worker and ends the loop.

use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use nlpworker_core::{Envelope, EnvelopeStream, Field, Kind, Message, MessageError};

use crate::error::{Result, RunnerError};
use crate::events::{self, RunnerEvent};
use crate::intake::IntakeSender;
use crate::progress::ProgressMonitor;
use crate::runner::RunnerStatus;

pub(crate) struct DispatchLoop {
    pub parallelism: usize,
    /// Index used when an EXTRACT_NLP message carries none
    pub default_index: String,
    pub intake: IntakeSender,
    pub monitor: Arc<ProgressMonitor>,
    pub status: Arc<watch::Sender<RunnerStatus>>,
    pub events: broadcast::Sender<RunnerEvent>,
    pub dropped: Arc<AtomicU64>,
}

impl DispatchLoop {
    /// Consume the stream until SHUTDOWN
    ///
    /// Consumes `self`, so the intake sender is dropped on every exit path and
    /// workers finish whatever was queued.
    pub async fn run(self, mut stream: EnvelopeStream) -> Result<()> {
        while let Some(item) = stream.next().await {
            let envelope = item.map_err(RunnerError::Bus)?;
            let message = match self.decode(envelope) {
                Ok(message) => message,
                Err(e) => {
                    self.drop_message(e);
                    continue;
                }
            };

            match message {
                Message::ExtractNlp(unit) => {
                    debug!(
                        document_id = %unit.document_id,
                        routing_id = %unit.routing_id,
                        index = %unit.index_name,
                        "Queueing extraction"
                    );
                    self.intake.submit(unit).await?;
                }
                Message::InitMonitoring { value } => {
                    let expected_total = self.monitor.record_expected(value);
                    info!(added = value, expected_total, "Monitoring initialized");
                    events::emit(
                        &self.events,
                        RunnerEvent::MonitoringInitialized {
                            added: value,
                            expected_total,
                        },
                    );
                }
                Message::Shutdown => {
                    info!(
                        workers = self.parallelism,
                        "Shutdown received, draining intake queue"
                    );
                    self.status.send_replace(RunnerStatus::Draining);
                    events::emit(&self.events, RunnerEvent::Draining);
                    self.intake.terminate(self.parallelism).await?;
                    return Ok(());
                }
                Message::NlpDone(done) => {
                    debug!(document_id = %done.document_id, "Ignoring NLP_DONE on work channel");
                }
            }
        }

        warn!("Bus stream ended before shutdown");
        Err(RunnerError::BusClosed)
    }

    fn decode(&self, envelope: Envelope) -> std::result::Result<Message, MessageError> {
        let envelope = if envelope.kind() == Kind::ExtractNlp {
            envelope.with_default(Field::IndexName, self.default_index.as_str())
        } else {
            envelope
        };
        Message::try_from(envelope)
    }

    fn drop_message(&self, error: MessageError) {
        let dropped = self.dropped.fetch_add(1, Ordering::AcqRel) + 1;
        warn!(error = %error, dropped, "Dropping malformed message");
        events::emit(
            &self.events,
            RunnerEvent::MessageDropped {
                reason: error.to_string(),
            },
        );
    }
}
