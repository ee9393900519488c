// Stop-word language guess for plain-text documents

use nlpworker_core::Language;

const STOP_WORDS: &[(Language, &[&str])] = &[
    (
        Language::English,
        &["the", "and", "of", "to", "is", "in", "that", "with", "for", "was"],
    ),
    (
        Language::French,
        &["le", "la", "les", "et", "des", "est", "une", "dans", "pour", "que"],
    ),
    (
        Language::Spanish,
        &["el", "los", "las", "y", "es", "una", "por", "con", "para", "del"],
    ),
    (
        Language::German,
        &["der", "die", "und", "das", "ist", "nicht", "mit", "ein", "eine", "für"],
    ),
    (
        Language::Italian,
        &["il", "gli", "e", "di", "che", "è", "della", "con", "per", "non"],
    ),
    (
        Language::Dutch,
        &["de", "het", "een", "en", "van", "niet", "met", "voor", "zijn", "dat"],
    ),
    (
        Language::Portuguese,
        &["o", "os", "e", "do", "da", "não", "uma", "com", "para", "em"],
    ),
    (
        Language::Basque,
        &["eta", "da", "ez", "bat", "dira", "baina", "ere", "hau", "zen", "du"],
    ),
];

/// Guess the language of `text` by counting stop words
///
/// Returns `Language::Unknown` when no stop word matches.
pub fn guess_language(text: &str) -> Language {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut best = (Language::Unknown, 0usize);
    for (language, stop_words) in STOP_WORDS {
        let hits = words
            .iter()
            .filter(|w| stop_words.contains(&w.as_str()))
            .count();
        if hits > best.1 {
            best = (*language, hits);
        }
    }
    best.0
}
