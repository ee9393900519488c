// JSON-lines bus over an async reader / writer
//
// Decision: Each input line is one Envelope. Lines that are not valid
// envelopes are logged and skipped here, at the transport boundary, so the
// subscriber only ever sees well-formed JSON. End of input ends the stream.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex as SyncMutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

use nlpworker_core::{Channel, CoreError, Envelope, EnvelopeStream, MessageBus, Result};

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Bus reading envelopes from a line-oriented input and writing published
/// envelopes as JSON lines to an output
///
/// The input can be subscribed to once, on the bus channel only.
pub struct LineBus {
    channel: Channel,
    reader: SyncMutex<Option<Reader>>,
    writer: Mutex<Writer>,
}

impl LineBus {
    pub fn new<R, W>(channel: Channel, reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            channel,
            reader: SyncMutex::new(Some(Box::new(reader))),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Bus on the process's stdin / stdout
    pub fn stdio(channel: Channel) -> Self {
        Self::new(
            channel,
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    fn check_channel(&self, channel: &Channel) -> Result<()> {
        if channel != &self.channel {
            return Err(CoreError::bus(format!(
                "line bus carries channel {}, not {}",
                self.channel, channel
            )));
        }
        Ok(())
    }
}

/// Parse one input line; `None` for blank or malformed lines
fn parse_line(line: &str) -> Option<Envelope> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Envelope>(line) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!(error = %e, line, "Skipping malformed bus line");
            None
        }
    }
}

#[async_trait]
impl MessageBus for LineBus {
    async fn publish_envelope(&self, channel: &Channel, envelope: Envelope) -> Result<usize> {
        self.check_channel(channel)?;

        let mut line = serde_json::to_vec(&envelope)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| CoreError::bus(format!("write failed: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| CoreError::bus(format!("flush failed: {}", e)))?;
        Ok(1)
    }

    async fn subscribe(&self, channel: &Channel) -> Result<EnvelopeStream> {
        self.check_channel(channel)?;

        let reader = self
            .reader
            .lock()
            .take()
            .ok_or_else(|| CoreError::bus("line bus input is already subscribed"))?;
        debug!(%channel, "Subscribed to line input");

        let stream = LinesStream::new(reader.lines()).filter_map(|line| async move {
            match line {
                Ok(line) => parse_line(&line).map(Ok),
                Err(e) => Some(Err(CoreError::bus(format!("read failed: {}", e)))),
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlpworker_core::{Kind, Message};

    fn bus_over(input: &'static str) -> (LineBus, tokio::io::DuplexStream) {
        let (writer, reader) = tokio::io::duplex(4096);
        let bus = LineBus::new(Channel::nlp(), input.as_bytes(), writer);
        (bus, reader)
    }

    #[tokio::test]
    async fn test_reads_envelopes_and_skips_garbage() {
        let input = concat!(
            r#"{"type":"INIT_MONITORING","fields":{"VALUE":"2"}}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"type":"UNKNOWN_KIND"}"#,
            "\n",
            r#"{"type":"SHUTDOWN"}"#,
            "\n",
        );
        let (bus, _out) = bus_over(input);

        let kinds: Vec<Kind> = bus
            .subscribe(&Channel::nlp())
            .await
            .unwrap()
            .map(|e| e.unwrap().kind())
            .collect()
            .await;

        assert_eq!(kinds, vec![Kind::InitMonitoring, Kind::Shutdown]);
    }

    #[tokio::test]
    async fn test_second_subscription_fails() {
        let (bus, _out) = bus_over("");
        let _first = bus.subscribe(&Channel::nlp()).await.unwrap();
        assert!(bus.subscribe(&Channel::nlp()).await.is_err());
    }

    #[tokio::test]
    async fn test_other_channel_is_rejected() {
        let (bus, _out) = bus_over("");
        assert!(bus.subscribe(&Channel::new("INDEX")).await.is_err());
        assert!(bus
            .publish(&Channel::new("INDEX"), Message::Shutdown)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_publish_writes_json_line() {
        let (bus, out) = bus_over("");
        bus.publish(&Channel::nlp(), Message::init_monitoring(5))
            .await
            .unwrap();
        drop(bus);

        let mut lines = tokio::io::BufReader::new(out).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"type":"INIT_MONITORING","fields":{"VALUE":"5"}}"#);
    }
}
