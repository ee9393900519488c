// Document languages known to the pipelines

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of a document, as detected at indexing time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    English,
    French,
    Spanish,
    German,
    Italian,
    Dutch,
    Portuguese,
    Basque,
    Unknown,
}

impl Language {
    /// All languages, `Unknown` last
    pub const ALL: [Language; 9] = [
        Language::English,
        Language::French,
        Language::Spanish,
        Language::German,
        Language::Italian,
        Language::Dutch,
        Language::Portuguese,
        Language::Basque,
        Language::Unknown,
    ];

    /// ISO 639-1 code
    pub fn iso_code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
            Language::Spanish => "es",
            Language::German => "de",
            Language::Italian => "it",
            Language::Dutch => "nl",
            Language::Portuguese => "pt",
            Language::Basque => "eu",
            Language::Unknown => "unknown",
        }
    }

    /// English name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::French => "french",
            Language::Spanish => "spanish",
            Language::German => "german",
            Language::Italian => "italian",
            Language::Dutch => "dutch",
            Language::Portuguese => "portuguese",
            Language::Basque => "basque",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.iso_code())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    /// Accepts an ISO code or an English name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.iso_code() == needle || l.name() == needle)
            .ok_or_else(|| anyhow::anyhow!("Unknown language: {}", s))
    }
}
