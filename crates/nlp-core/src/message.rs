// Bus protocol
//
// Decision: Two layers. `Envelope` is the wire shape (kind + string fields) and
// is what transports carry. `Message` is the validated, typed form the runner
// consumes. `Envelope -> Message` is the only place string fields get parsed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::annotations::PipelineKind;

// ============================================================================
// Channel
// ============================================================================

/// A named bus channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel(String);

impl Channel {
    /// Name of the channel carrying NLP work
    pub const NLP: &'static str = "NLP";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The NLP work channel
    pub fn nlp() -> Self {
        Self::new(Self::NLP)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::nlp()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Envelope (wire form)
// ============================================================================

/// Message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    /// One document to run NLP extraction on
    ExtractNlp,
    /// Adds to the expected number of documents
    InitMonitoring,
    /// No more work will be published
    Shutdown,
    /// A document finished extraction
    NlpDone,
}

/// Envelope field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    DocId,
    RoutingId,
    IndexName,
    Value,
    Pipeline,
    Entities,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::DocId => "DOC_ID",
            Field::RoutingId => "R_ID",
            Field::IndexName => "INDEX_NAME",
            Field::Value => "VALUE",
            Field::Pipeline => "PIPELINE",
            Field::Entities => "ENTITIES",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of a bus message
///
/// ```
/// use nlpworker_core::{Envelope, Field, Kind};
///
/// let envelope = Envelope::new(Kind::InitMonitoring).with(Field::Value, "4");
/// let json = serde_json::to_string(&envelope).unwrap();
/// assert_eq!(json, r#"{"type":"INIT_MONITORING","fields":{"VALUE":"4"}}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    kind: Kind,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

impl Envelope {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, replacing any previous value
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.fields.insert(field.as_str().to_string(), value.into());
        self
    }

    /// Set a field only when it is absent
    pub fn with_default(mut self, field: Field, value: impl Into<String>) -> Self {
        self.fields
            .entry(field.as_str().to_string())
            .or_insert_with(|| value.into());
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(field.as_str()).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    fn require(&self, field: Field) -> Result<String, MessageError> {
        match self.get(field) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(MessageError::MissingField {
                kind: self.kind,
                field,
            }),
        }
    }
}

// ============================================================================
// Message (typed form)
// ============================================================================

/// Protocol violations found while validating an envelope
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("{kind:?} message is missing field {field}")]
    MissingField { kind: Kind, field: Field },

    #[error("expected a non-negative integer, got {0:?}")]
    InvalidValue(String),

    #[error("unknown pipeline {0:?}")]
    InvalidPipeline(String),
}

/// One unit of extraction work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub document_id: String,
    pub routing_id: String,
    pub index_name: String,
}

impl WorkUnit {
    pub fn new(
        document_id: impl Into<String>,
        routing_id: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            routing_id: routing_id.into(),
            index_name: index_name.into(),
        }
    }
}

/// Notice that a document went through a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NlpDone {
    pub document_id: String,
    pub routing_id: String,
    pub index_name: String,
    pub pipeline: PipelineKind,
    /// Number of entity mentions found
    pub entities: u64,
}

/// Validated bus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    ExtractNlp(WorkUnit),
    InitMonitoring { value: u64 },
    Shutdown,
    NlpDone(NlpDone),
}

impl Message {
    pub fn extract(
        document_id: impl Into<String>,
        routing_id: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        Message::ExtractNlp(WorkUnit::new(document_id, routing_id, index_name))
    }

    pub fn init_monitoring(value: u64) -> Self {
        Message::InitMonitoring { value }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Message::ExtractNlp(_) => Kind::ExtractNlp,
            Message::InitMonitoring { .. } => Kind::InitMonitoring,
            Message::Shutdown => Kind::Shutdown,
            Message::NlpDone(_) => Kind::NlpDone,
        }
    }
}

impl TryFrom<Envelope> for Message {
    type Error = MessageError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.kind {
            Kind::ExtractNlp => Ok(Message::ExtractNlp(WorkUnit {
                document_id: envelope.require(Field::DocId)?,
                routing_id: envelope.require(Field::RoutingId)?,
                index_name: envelope.require(Field::IndexName)?,
            })),
            Kind::InitMonitoring => {
                let raw = envelope.require(Field::Value)?;
                let value = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| MessageError::InvalidValue(raw))?;
                Ok(Message::InitMonitoring { value })
            }
            Kind::Shutdown => Ok(Message::Shutdown),
            Kind::NlpDone => {
                let pipeline_raw = envelope.require(Field::Pipeline)?;
                let pipeline = pipeline_raw
                    .parse::<PipelineKind>()
                    .map_err(|_| MessageError::InvalidPipeline(pipeline_raw))?;
                let entities_raw = envelope.require(Field::Entities)?;
                let entities = entities_raw
                    .parse::<u64>()
                    .map_err(|_| MessageError::InvalidValue(entities_raw))?;
                Ok(Message::NlpDone(NlpDone {
                    document_id: envelope.require(Field::DocId)?,
                    routing_id: envelope.require(Field::RoutingId)?,
                    index_name: envelope.require(Field::IndexName)?,
                    pipeline,
                    entities,
                }))
            }
        }
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        match message {
            Message::ExtractNlp(unit) => Envelope::new(Kind::ExtractNlp)
                .with(Field::DocId, unit.document_id)
                .with(Field::RoutingId, unit.routing_id)
                .with(Field::IndexName, unit.index_name),
            Message::InitMonitoring { value } => {
                Envelope::new(Kind::InitMonitoring).with(Field::Value, value.to_string())
            }
            Message::Shutdown => Envelope::new(Kind::Shutdown),
            Message::NlpDone(done) => Envelope::new(Kind::NlpDone)
                .with(Field::DocId, done.document_id)
                .with(Field::RoutingId, done.routing_id)
                .with(Field::IndexName, done.index_name)
                .with(Field::Pipeline, done.pipeline.as_str())
                .with(Field::Entities, done.entities.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_nlp_from_envelope() {
        let envelope = Envelope::new(Kind::ExtractNlp)
            .with(Field::DocId, "doc_id")
            .with(Field::RoutingId, "routing")
            .with(Field::IndexName, "local-datashare");

        let message = Message::try_from(envelope).unwrap();
        assert_eq!(
            message,
            Message::extract("doc_id", "routing", "local-datashare")
        );
        assert_eq!(message.kind(), Kind::ExtractNlp);
    }

    #[test]
    fn test_extract_nlp_missing_routing() {
        let envelope = Envelope::new(Kind::ExtractNlp)
            .with(Field::DocId, "doc_id")
            .with(Field::IndexName, "idx");

        let err = Message::try_from(envelope).unwrap_err();
        assert_eq!(
            err,
            MessageError::MissingField {
                kind: Kind::ExtractNlp,
                field: Field::RoutingId
            }
        );
    }

    #[test]
    fn test_empty_field_counts_as_missing() {
        let envelope = Envelope::new(Kind::ExtractNlp)
            .with(Field::DocId, "")
            .with(Field::RoutingId, "r")
            .with(Field::IndexName, "idx");

        assert!(matches!(
            Message::try_from(envelope),
            Err(MessageError::MissingField {
                field: Field::DocId,
                ..
            })
        ));
    }

    #[test]
    fn test_init_monitoring_value() {
        let envelope = Envelope::new(Kind::InitMonitoring).with(Field::Value, "42");
        assert_eq!(
            Message::try_from(envelope).unwrap(),
            Message::init_monitoring(42)
        );
    }

    #[test]
    fn test_init_monitoring_rejects_non_numeric_and_negative() {
        for bad in ["four", "-4", "1.5"] {
            let envelope = Envelope::new(Kind::InitMonitoring).with(Field::Value, bad);
            assert_eq!(
                Message::try_from(envelope).unwrap_err(),
                MessageError::InvalidValue(bad.to_string())
            );
        }
    }

    #[test]
    fn test_with_default_keeps_existing_value() {
        let envelope = Envelope::new(Kind::ExtractNlp)
            .with(Field::IndexName, "explicit")
            .with_default(Field::IndexName, "fallback");
        assert_eq!(envelope.get(Field::IndexName), Some("explicit"));

        let envelope = Envelope::new(Kind::ExtractNlp).with_default(Field::IndexName, "fallback");
        assert_eq!(envelope.get(Field::IndexName), Some("fallback"));
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope: Envelope = Message::extract("d", "r", "i").into();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "EXTRACT_NLP",
                "fields": {"DOC_ID": "d", "R_ID": "r", "INDEX_NAME": "i"}
            })
        );

        let shutdown: Envelope = serde_json::from_str(r#"{"type":"SHUTDOWN"}"#).unwrap();
        assert_eq!(Message::try_from(shutdown).unwrap(), Message::Shutdown);
    }

    #[test]
    fn test_nlp_done_through_envelope() {
        let done = Message::NlpDone(NlpDone {
            document_id: "d".into(),
            routing_id: "r".into(),
            index_name: "i".into(),
            pipeline: PipelineKind::Pattern,
            entities: 3,
        });
        let envelope: Envelope = done.clone().into();
        assert_eq!(envelope.get(Field::Pipeline), Some("PATTERN"));
        assert_eq!(Message::try_from(envelope).unwrap(), done);
    }

    #[test]
    fn test_nlp_done_with_unknown_pipeline() {
        let envelope = Envelope::new(Kind::NlpDone)
            .with(Field::DocId, "d")
            .with(Field::RoutingId, "r")
            .with(Field::IndexName, "i")
            .with(Field::Pipeline, "SPACY")
            .with(Field::Entities, "1");
        assert_eq!(
            Message::try_from(envelope).unwrap_err(),
            MessageError::InvalidPipeline("SPACY".into())
        );
    }

    #[test]
    fn test_default_channel_is_nlp() {
        assert_eq!(Channel::default().name(), "NLP");
        assert_eq!(Channel::new("other").to_string(), "other");
    }
}
