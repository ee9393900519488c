// Collaborator traits consumed by the extraction runner
//
// These traits keep the runner independent from any concrete backend:
// - In-memory implementations for tests and local runs
// - Stream-backed bus for the command-line worker
// - Real engines / indexes plugged in by the embedding application

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::annotations::{Annotations, PipelineKind};
use crate::document::Document;
use crate::error::Result;
use crate::language::Language;
use crate::message::{Channel, Envelope, Message};

// ============================================================================
// Pipeline - NLP annotation engine
// ============================================================================

/// NLP engine producing annotations for one document at a time
///
/// A pipeline is shared by every worker of a runner. `initialize` may be
/// called concurrently for the same language and must be idempotent.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Engine family, reported in results
    fn kind(&self) -> PipelineKind;

    /// Load whatever the engine needs for `language`
    ///
    /// Returns `false` when the language is not supported.
    async fn initialize(&self, language: Language) -> Result<bool>;

    /// Annotate one document
    async fn process(
        &self,
        document_id: &str,
        routing_id: &str,
        language: Language,
    ) -> Result<Annotations>;

    /// Annotate one document stored in `index`
    ///
    /// Pipelines that read content from an index override this; the default
    /// ignores `index` and calls [`Pipeline::process`].
    async fn process_in(
        &self,
        index: &str,
        document_id: &str,
        routing_id: &str,
        language: Language,
    ) -> Result<Annotations> {
        let _ = index;
        self.process(document_id, routing_id, language).await
    }
}

// ============================================================================
// DocumentSource - Document lookup
// ============================================================================

/// Resolves documents by index, id and routing
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch a document; `CoreError::DocumentNotFound` when it does not exist
    async fn get(&self, index: &str, id: &str, routing: &str) -> Result<Document>;
}

// ============================================================================
// MessageBus - Publish / subscribe transport
// ============================================================================

/// Stream of envelopes received on a subscription
///
/// The stream ends when the transport goes away. An `Err` item is a
/// transport failure, not a malformed message.
pub type EnvelopeStream = Pin<Box<dyn Stream<Item = Result<Envelope>> + Send>>;

/// Ordered publish / subscribe transport
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a raw envelope; returns the number of subscribers reached
    async fn publish_envelope(&self, channel: &Channel, envelope: Envelope) -> Result<usize>;

    /// Subscribe to a channel
    ///
    /// Only envelopes published after this call returns are delivered.
    async fn subscribe(&self, channel: &Channel) -> Result<EnvelopeStream>;

    /// Publish a typed message
    async fn publish(&self, channel: &Channel, message: Message) -> Result<usize> {
        self.publish_envelope(channel, message.into()).await
    }
}
