// Runner configuration
//
// Decision: Configuration is fixed at construction; a run never observes changes.
// Decision: Environment variables give defaults, builder methods override them.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use nlpworker_core::{Channel, Language, User};

/// Default number of workers (standalone mode)
pub const DEFAULT_PARALLELISM: usize = 1;

/// Default bound of the intake queue between dispatch loop and workers
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Callback invoked once when the runner is ready to receive work
pub type ReadyCallback = Arc<dyn Fn() + Send + Sync>;

/// Configuration for an extraction run
#[derive(Clone)]
pub struct RunnerConfig {
    /// Identifier used in logs
    pub run_id: String,
    /// Number of concurrent workers (>= 1)
    pub parallelism: usize,
    /// Capacity of the intake queue (>= 1)
    pub queue_capacity: usize,
    /// Channel carrying NLP work
    pub channel: Channel,
    /// Identity the runner works for; decides the default index
    pub user: User,
    /// Where to publish NLP_DONE notices, if anywhere
    pub results_channel: Option<Channel>,
    /// Languages to initialize before reporting ready
    pub preload_languages: Vec<Language>,
    on_ready: Option<ReadyCallback>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            run_id: format!("runner-{}", Uuid::now_v7()),
            parallelism: DEFAULT_PARALLELISM,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            channel: Channel::nlp(),
            user: User::local(),
            results_channel: None,
            preload_languages: Vec::new(),
            on_ready: None,
        }
    }
}

impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("run_id", &self.run_id)
            .field("parallelism", &self.parallelism)
            .field("queue_capacity", &self.queue_capacity)
            .field("channel", &self.channel)
            .field("user", &self.user)
            .field("results_channel", &self.results_channel)
            .field("preload_languages", &self.preload_languages)
            .field("on_ready", &self.on_ready.is_some())
            .finish()
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables (with defaults)
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NLP_PARALLELISM` | `1` | Number of workers |
    /// | `NLP_QUEUE_CAPACITY` | `64` | Intake queue bound |
    /// | `NLP_CHANNEL` | `NLP` | Bus channel to consume |
    /// | `NLP_RESULTS_CHANNEL` | unset | Channel for NLP_DONE notices |
    /// | `NLP_PRELOAD_LANGUAGES` | empty | Comma-separated languages to warm up |
    /// | `DS_USER` | `local` | User / tenant id |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parallelism = lookup("NLP_PARALLELISM")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PARALLELISM);

        let queue_capacity = lookup("NLP_QUEUE_CAPACITY")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        let channel = lookup("NLP_CHANNEL")
            .filter(|v| !v.trim().is_empty())
            .map(Channel::new)
            .unwrap_or_default();

        let results_channel = lookup("NLP_RESULTS_CHANNEL")
            .filter(|v| !v.trim().is_empty())
            .map(Channel::new);

        let preload_languages = lookup("NLP_PRELOAD_LANGUAGES")
            .map(|v| parse_languages(&v))
            .unwrap_or_default();

        let user = lookup("DS_USER")
            .filter(|v| !v.trim().is_empty())
            .map(User::new)
            .unwrap_or_default();

        Self::default()
            .with_parallelism(parallelism)
            .with_queue_capacity(queue_capacity)
            .with_channel(channel)
            .with_user(user)
            .with_results_channel(results_channel)
            .with_preload_languages(preload_languages)
    }

    /// Set the run identifier
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Set the number of workers (clamped to at least 1)
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Set the intake queue capacity (clamped to at least 1)
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    /// Publish an NLP_DONE notice per processed document on `channel`
    pub fn with_results_channel(mut self, channel: Option<Channel>) -> Self {
        self.results_channel = channel;
        self
    }

    pub fn with_preload_languages(mut self, languages: Vec<Language>) -> Self {
        self.preload_languages = languages;
        self
    }

    /// Register the readiness callback
    pub fn with_on_ready<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_ready = Some(Arc::new(callback));
        self
    }

    pub(crate) fn on_ready(&self) -> Option<&ReadyCallback> {
        self.on_ready.as_ref()
    }
}

/// Parse a comma-separated language list, skipping unknown entries
pub fn parse_languages(raw: &str) -> Vec<Language> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<Language>() {
            Ok(language) => Some(language),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unknown preload language");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_runner_config_default() {
        let config = RunnerConfig::default();
        assert!(config.run_id.starts_with("runner-"));
        assert_eq!(config.parallelism, 1);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.channel, Channel::nlp());
        assert_eq!(config.user, User::local());
        assert!(config.results_channel.is_none());
        assert!(config.on_ready().is_none());
    }

    #[test]
    fn test_runner_config_from_lookup() {
        let config = RunnerConfig::from_lookup(lookup_from(&[
            ("NLP_PARALLELISM", "4"),
            ("NLP_QUEUE_CAPACITY", "16"),
            ("NLP_CHANNEL", "NLP_TEST"),
            ("NLP_RESULTS_CHANNEL", "NLP_RESULTS"),
            ("NLP_PRELOAD_LANGUAGES", "en, FRENCH,xx"),
            ("DS_USER", "alice"),
        ]));

        assert_eq!(config.parallelism, 4);
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.channel.name(), "NLP_TEST");
        assert_eq!(config.results_channel, Some(Channel::new("NLP_RESULTS")));
        assert_eq!(
            config.preload_languages,
            vec![Language::English, Language::French]
        );
        assert_eq!(config.user.default_index(), "alice-datashare");
    }

    #[test]
    fn test_runner_config_from_lookup_falls_back_on_bad_values() {
        let config = RunnerConfig::from_lookup(lookup_from(&[
            ("NLP_PARALLELISM", "many"),
            ("NLP_QUEUE_CAPACITY", "0"),
            ("NLP_CHANNEL", "  "),
        ]));

        assert_eq!(config.parallelism, 1);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.channel, Channel::nlp());
    }

    #[test]
    fn test_parallelism_is_clamped() {
        assert_eq!(RunnerConfig::new().with_parallelism(0).parallelism, 1);
        assert_eq!(RunnerConfig::new().with_parallelism(8).parallelism, 8);
    }

    #[test]
    fn test_on_ready_callback_is_kept() {
        let config = RunnerConfig::new().with_on_ready(|| {});
        assert!(config.on_ready().is_some());
        assert!(format!("{:?}", config).contains("on_ready: true"));
    }
}
