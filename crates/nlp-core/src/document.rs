// Document entity as returned by a DocumentSource

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::language::Language;

/// Indexing status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Content extracted, not yet indexed
    Parsed,
    /// Indexed and searchable
    #[default]
    Indexed,
    /// NLP extraction finished
    Done,
}

/// An indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub path: PathBuf,
    pub content: String,
    pub language: Language,
    pub content_type: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub status: DocumentStatus,
    pub content_length: u64,
}

impl Document {
    /// Create an indexed document; `content_length` is the content's byte length
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
        language: Language,
    ) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            path: path.into(),
            content_length: content.len() as u64,
            content,
            language,
            content_type: "text/plain".to_string(),
            metadata: HashMap::new(),
            status: DocumentStatus::Indexed,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = status;
        self
    }
}
