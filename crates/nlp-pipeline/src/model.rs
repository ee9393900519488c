// Per-language regex models

use regex::Regex;

use nlpworker_core::{Annotations, CoreError, EntityCategory, Language, Result};

const EMAIL: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";

const ORGANIZATION_SUFFIXES: &str =
    "Inc|Ltd|LLC|Corp|Co|SA|SAS|SARL|GmbH|AG|SpA|Srl|BV|NV|SL|Lda|Ltda";

/// Courtesy titles that introduce a person name
fn titles(language: Language) -> Option<&'static str> {
    match language {
        Language::English => Some("Mr|Mrs|Ms|Dr|Sir|Prof"),
        Language::French => Some("M|Mme|Mlle|Dr|Me|Pr"),
        Language::Spanish => Some("Sr|Sra|Srta|Dr|Dra|Don|Doña"),
        Language::German => Some("Herr|Frau|Dr|Prof"),
        Language::Italian => Some("Sig|Sigra|Dott|Dr|Prof"),
        Language::Dutch => Some("Dhr|Mevr|Dr|Prof"),
        Language::Portuguese => Some("Sr|Sra|Dr|Dra|Dom"),
        Language::Basque => Some("Jauna|Andrea|Dr"),
        Language::Unknown => None,
    }
}

/// Compiled entity patterns for one language
#[derive(Debug)]
pub struct PatternModel {
    email: Regex,
    person: Regex,
    organization: Regex,
}

impl PatternModel {
    /// Whether a model exists for `language`
    pub fn supports(language: Language) -> bool {
        titles(language).is_some()
    }

    /// Compile the model for `language`
    pub fn build(language: Language) -> Result<Self> {
        let titles = titles(language).ok_or_else(|| {
            CoreError::pipeline(format!("no pattern model for language {}", language))
        })?;

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CoreError::pipeline(format!("bad pattern: {}", e)))
        };

        Ok(Self {
            email: compile(EMAIL)?,
            person: compile(&format!(
                r"\b(?:{})\.?\s+(\p{{Lu}}\p{{Ll}}+(?:[ -]\p{{Lu}}\p{{Ll}}+)*)",
                titles
            ))?,
            organization: compile(&format!(
                r"\b((?:\p{{Lu}}[\p{{L}}&]*\s+){{1,4}}(?:{}))\b",
                ORGANIZATION_SUFFIXES
            ))?,
        })
    }

    /// Find entities in `content`, ordered by offset
    pub fn annotate(&self, document_id: &str, content: &str, annotations: &mut Annotations) {
        let mut found: Vec<(usize, EntityCategory, &str)> = Vec::new();

        for m in self.email.find_iter(content) {
            found.push((m.start(), EntityCategory::Email, m.as_str()));
        }
        for caps in self.person.captures_iter(content) {
            if let Some(name) = caps.get(1) {
                found.push((name.start(), EntityCategory::Person, name.as_str()));
            }
        }
        for caps in self.organization.captures_iter(content) {
            if let Some(org) = caps.get(1) {
                found.push((org.start(), EntityCategory::Organization, org.as_str()));
            }
        }

        found.sort_by_key(|(offset, _, _)| *offset);
        tracing::trace!(document_id, entities = found.len(), "Pattern model matched");
        for (offset, category, mention) in found {
            annotations.add(category, mention, offset);
        }
    }
}
