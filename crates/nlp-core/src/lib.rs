// NLP Worker Core
//
// Shared vocabulary for the extraction runner and its collaborators:
// - Bus protocol (Envelope on the wire, Message once validated)
// - Domain entities (Document, Language, Annotations, User)
// - Collaborator traits (Pipeline, DocumentSource, MessageBus)
// - Language-keyed model cache used by pipeline implementations
//
// Key design decisions:
// - Nothing here knows about workers or queues; the runner crate owns that
// - Traits are async (async_trait) and object safe, shared as Arc<dyn Trait>
// - Errors are one thiserror enum; per-unit failures are values, not panics

pub mod annotations;
pub mod document;
pub mod error;
pub mod language;
pub mod message;
pub mod model_cache;
pub mod traits;
pub mod user;

// Re-exports for convenience
pub use annotations::{Annotations, EntityCategory, NamedEntity, PipelineKind};
pub use document::{Document, DocumentStatus};
pub use error::{CoreError, Result};
pub use language::Language;
pub use message::{Channel, Envelope, Field, Kind, Message, MessageError, NlpDone, WorkUnit};
pub use model_cache::ModelCache;
pub use traits::{DocumentSource, EnvelopeStream, MessageBus, Pipeline};
pub use user::User;
