// Pattern pipeline: Pipeline implementation over PatternModel

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use nlpworker_core::{
    Annotations, CoreError, DocumentSource, Language, ModelCache, Pipeline, PipelineKind, Result,
};

use crate::model::PatternModel;

/// Regex-based entity pipeline
///
/// Reads document content from a `DocumentSource`: from the unit's index via
/// `process_in`, from the configured default index via `process`. Models are
/// compiled on first use of a language and shared by all callers.
pub struct PatternPipeline {
    source: Arc<dyn DocumentSource>,
    index: String,
    models: ModelCache<PatternModel>,
}

impl PatternPipeline {
    pub fn new(source: Arc<dyn DocumentSource>, index: impl Into<String>) -> Self {
        Self {
            source,
            index: index.into(),
            models: ModelCache::new(),
        }
    }

    /// Languages whose model is loaded
    pub fn loaded_languages(&self) -> Vec<Language> {
        self.models.loaded_languages()
    }

    async fn annotate(
        &self,
        index: &str,
        document_id: &str,
        routing_id: &str,
        language: Language,
    ) -> Result<Annotations> {
        if !PatternModel::supports(language) {
            return Err(CoreError::pipeline(format!(
                "language {} is not supported",
                language
            )));
        }
        let model = self.model(language).await?;
        let document = self.source.get(index, document_id, routing_id).await?;

        let mut annotations = Annotations::new(document_id, PipelineKind::Pattern, language);
        model.annotate(document_id, &document.content, &mut annotations);
        debug!(
            index,
            document_id,
            routing_id,
            entities = annotations.entities.len(),
            "Pattern pipeline processed document"
        );
        Ok(annotations)
    }

    async fn model(&self, language: Language) -> Result<Arc<PatternModel>> {
        self.models
            .get_or_load(language, || async move {
                info!(%language, "Loading pattern model");
                PatternModel::build(language)
            })
            .await
    }
}

#[async_trait]
impl Pipeline for PatternPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Pattern
    }

    async fn initialize(&self, language: Language) -> Result<bool> {
        if !PatternModel::supports(language) {
            debug!(%language, "Language not supported by pattern pipeline");
            return Ok(false);
        }
        self.model(language).await?;
        Ok(true)
    }

    async fn process(
        &self,
        document_id: &str,
        routing_id: &str,
        language: Language,
    ) -> Result<Annotations> {
        self.annotate(&self.index, document_id, routing_id, language).await
    }

    async fn process_in(
        &self,
        index: &str,
        document_id: &str,
        routing_id: &str,
        language: Language,
    ) -> Result<Annotations> {
        self.annotate(index, document_id, routing_id, language).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlpworker_core::{Document, EntityCategory};
    use nlpworker_store::InMemoryDocumentStore;

    async fn pipeline_with(doc: Document) -> PatternPipeline {
        let store = InMemoryDocumentStore::new();
        store.insert("local-datashare", doc).await;
        PatternPipeline::new(Arc::new(store), "local-datashare")
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let pipeline = pipeline_with(Document::new("d", "p", "", Language::English)).await;

        assert!(pipeline.initialize(Language::English).await.unwrap());
        assert!(pipeline.initialize(Language::English).await.unwrap());
        assert_eq!(pipeline.loaded_languages(), vec![Language::English]);
    }

    #[tokio::test]
    async fn test_initialize_unknown_language_returns_false() {
        let pipeline = pipeline_with(Document::new("d", "p", "", Language::Unknown)).await;
        assert!(!pipeline.initialize(Language::Unknown).await.unwrap());
        assert!(pipeline.loaded_languages().is_empty());
    }

    #[tokio::test]
    async fn test_process_reads_content_from_source() {
        let pipeline = pipeline_with(Document::new(
            "doc1",
            "mail.eml",
            "Herr Klaus Weber schrieb an presse@example.de",
            Language::German,
        ))
        .await;

        let annotations = pipeline
            .process("doc1", "doc1", Language::German)
            .await
            .unwrap();

        assert_eq!(annotations.document_id, "doc1");
        assert_eq!(annotations.pipeline, PipelineKind::Pattern);
        assert_eq!(annotations.of(EntityCategory::Person).count(), 1);
        assert_eq!(annotations.of(EntityCategory::Email).count(), 1);
    }

    #[tokio::test]
    async fn test_process_missing_document_fails() {
        let pipeline = pipeline_with(Document::new("d", "p", "", Language::English)).await;
        let err = pipeline
            .process("missing", "missing", Language::English)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DocumentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_process_in_reads_the_named_index() {
        let store = InMemoryDocumentStore::new();
        store
            .insert(
                "other-index",
                Document::new("doc", "p", "Write to press@example.org", Language::English),
            )
            .await;
        store
            .insert(
                "local-datashare",
                Document::new("doc", "p", "nothing here", Language::English),
            )
            .await;
        let pipeline = PatternPipeline::new(Arc::new(store), "local-datashare");

        let annotations = pipeline
            .process_in("other-index", "doc", "doc", Language::English)
            .await
            .unwrap();
        assert_eq!(annotations.of(EntityCategory::Email).count(), 1);

        let annotations = pipeline
            .process("doc", "doc", Language::English)
            .await
            .unwrap();
        assert!(annotations.entities.is_empty());
    }

    #[tokio::test]
    async fn test_process_in_unknown_index_fails() {
        let pipeline = pipeline_with(Document::new("doc", "p", "", Language::English)).await;
        let err = pipeline
            .process_in("other-index", "doc", "doc", Language::English)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DocumentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_initialize_loads_once() {
        let pipeline = Arc::new(pipeline_with(Document::new("d", "p", "", Language::French)).await);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pipeline = pipeline.clone();
            handles.push(tokio::spawn(async move {
                pipeline.initialize(Language::French).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(pipeline.loaded_languages(), vec![Language::French]);
    }
}
