// In-memory publish / subscribe bus

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use nlpworker_core::{Channel, CoreError, Envelope, EnvelopeStream, MessageBus, Result};

/// Process-local bus for tests and embedding
///
/// Every subscriber gets its own unbounded queue, so delivery is ordered per
/// subscriber and nothing is dropped for slow readers. Like a pub/sub broker,
/// envelopes published while nobody listens are not replayed to later
/// subscribers.
///
/// Every published envelope is also kept in a per-channel history that is
/// never trimmed. It exists for test assertions; call [`InMemoryBus::clear_history`]
/// when a long-lived bus should not keep it.
#[derive(Default)]
pub struct InMemoryBus {
    subscribers: Mutex<HashMap<Channel, Vec<mpsc::UnboundedSender<Envelope>>>>,
    history: Mutex<HashMap<Channel, Vec<Envelope>>>,
    subscribed: Notify,
    closed: AtomicBool,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on a channel
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.subscribers
            .lock()
            .get(channel)
            .map(|subs| subs.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    /// Forget every recorded envelope
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Everything published on a channel so far, in order
    pub fn published(&self, channel: &Channel) -> Vec<Envelope> {
        self.history
            .lock()
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    /// Wait until a channel has at least `count` subscribers
    pub async fn wait_for_subscribers(&self, channel: &Channel, count: usize) {
        loop {
            let notified = self.subscribed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.subscriber_count(channel) >= count {
                return;
            }
            notified.await;
        }
    }

    /// Disconnect every subscriber and refuse further traffic
    ///
    /// Open subscription streams end, which subscribers see as a lost bus.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.subscribers.lock().clear();
        debug!("In-memory bus closed");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CoreError::BusClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish_envelope(&self, channel: &Channel, envelope: Envelope) -> Result<usize> {
        self.ensure_open()?;

        self.history
            .lock()
            .entry(channel.clone())
            .or_default()
            .push(envelope.clone());

        let mut subscribers = self.subscribers.lock();
        let Some(subs) = subscribers.get_mut(channel) else {
            return Ok(0);
        };
        subs.retain(|tx| tx.send(envelope.clone()).is_ok());
        Ok(subs.len())
    }

    async fn subscribe(&self, channel: &Channel) -> Result<EnvelopeStream> {
        self.ensure_open()?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .entry(channel.clone())
            .or_default()
            .push(tx);
        self.subscribed.notify_waiters();
        debug!(%channel, "New in-memory subscription");

        Ok(UnboundedReceiverStream::new(rx).map(Ok).boxed())
    }
}
