// In-memory document store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use nlpworker_core::{CoreError, Document, DocumentSource, Result};

/// In-memory document store
///
/// Stores documents in a HashMap keyed by (index, id). Routing is accepted but
/// not used for lookup, like a single-shard index.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<(String, String), Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document in an index
    pub async fn insert(&self, index: impl Into<String>, document: Document) {
        self.documents
            .write()
            .await
            .insert((index.into(), document.id.clone()), document);
    }

    /// Remove a document; returns it if it was present
    pub async fn remove(&self, index: &str, id: &str) -> Option<Document> {
        self.documents
            .write()
            .await
            .remove(&(index.to_string(), id.to_string()))
    }

    /// Number of documents across all indices
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentStore {
    async fn get(&self, index: &str, id: &str, routing: &str) -> Result<Document> {
        self.documents
            .read()
            .await
            .get(&(index.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| CoreError::not_found(index, id, routing))
    }
}
