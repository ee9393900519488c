// Pipeline output types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::language::Language;

/// Family of NLP engine that produced annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineKind {
    CoreNlp,
    OpenNlp,
    Ixa,
    Email,
    /// Regex-based entity matcher
    Pattern,
    /// Used by test doubles
    Test,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::CoreNlp => "CORENLP",
            PipelineKind::OpenNlp => "OPENNLP",
            PipelineKind::Ixa => "IXA",
            PipelineKind::Email => "EMAIL",
            PipelineKind::Pattern => "PATTERN",
            PipelineKind::Test => "TEST",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CORENLP" => Ok(PipelineKind::CoreNlp),
            "OPENNLP" => Ok(PipelineKind::OpenNlp),
            "IXA" => Ok(PipelineKind::Ixa),
            "EMAIL" => Ok(PipelineKind::Email),
            "PATTERN" => Ok(PipelineKind::Pattern),
            "TEST" => Ok(PipelineKind::Test),
            _ => anyhow::bail!("Unknown pipeline: {}", s),
        }
    }
}

/// Named entity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityCategory {
    Person,
    Organization,
    Location,
    Email,
}

/// A single entity mention within a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub category: EntityCategory,
    pub mention: String,
    /// Byte offset of the mention in the document content
    pub offset: usize,
}

/// Result of running a pipeline over one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    pub document_id: String,
    pub pipeline: PipelineKind,
    pub language: Language,
    #[serde(default)]
    pub entities: Vec<NamedEntity>,
}

impl Annotations {
    /// Create empty annotations
    pub fn new(document_id: impl Into<String>, pipeline: PipelineKind, language: Language) -> Self {
        Self {
            document_id: document_id.into(),
            pipeline,
            language,
            entities: Vec::new(),
        }
    }

    /// Add an entity mention
    pub fn add(&mut self, category: EntityCategory, mention: impl Into<String>, offset: usize) {
        self.entities.push(NamedEntity {
            category,
            mention: mention.into(),
            offset,
        });
    }

    /// Mentions of one category, in insertion order
    pub fn of(&self, category: EntityCategory) -> impl Iterator<Item = &NamedEntity> {
        self.entities.iter().filter(move |e| e.category == category)
    }
}
