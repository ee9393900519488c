// Language-keyed model cache
//
// Decision: Models load at most once per language, even when several workers
// ask for the same language at the same time. Each language gets its own
// OnceCell so a slow load for one language never blocks another.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::language::Language;

/// Init-once, read-many store of per-language models
pub struct ModelCache<M> {
    slots: Mutex<HashMap<Language, Arc<OnceCell<Arc<M>>>>>,
}

impl<M> ModelCache<M> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the model for `language`, running `load` if it is not cached yet
    ///
    /// Concurrent callers for the same language wait for the first load. A
    /// failed load leaves the slot empty so a later call can retry.
    pub async fn get_or_load<F, Fut>(&self, language: Language, load: F) -> Result<Arc<M>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<M>>,
    {
        let cell = self
            .slots
            .lock()
            .entry(language)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_try_init(|| async { load().await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    /// Languages with a loaded model
    pub fn loaded_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(language, _)| *language)
            .collect();
        languages.sort();
        languages
    }
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self::new()
    }
}
