// Filesystem document source
//
// Layout: <root>/<index>/<id>. The file content is the document content; the
// language is guessed from the text and the content type from the extension.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use nlpworker_core::{CoreError, Document, DocumentSource, Result};

use crate::language_guess::guess_language;

/// Reads documents from a directory tree
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a document, or `None` if index or id would escape the root
    fn document_path(&self, index: &str, id: &str) -> Option<PathBuf> {
        let is_plain = |s: &str| {
            !s.is_empty()
                && Path::new(s)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
                && Path::new(s).components().count() == 1
        };
        if !is_plain(index) || !is_plain(id) {
            return None;
        }
        Some(self.root.join(index).join(id))
    }
}

/// Content type from a file extension
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv",
        Some("md") => "text/markdown",
        Some("eml") => "message/rfc822",
        _ => "text/plain",
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn get(&self, index: &str, id: &str, routing: &str) -> Result<Document> {
        let path = self
            .document_path(index, id)
            .ok_or_else(|| CoreError::not_found(index, id, routing))?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::not_found(index, id, routing));
            }
            Err(e) => return Err(e.into()),
        };

        let language = guess_language(&content);
        debug!(index, id, %language, path = %path.display(), "Loaded document from disk");

        Ok(Document::new(id, path.clone(), content, language)
            .with_content_type(content_type_for(&path))
            .with_metadata("index", index)
            .with_metadata("routing", routing))
    }
}
