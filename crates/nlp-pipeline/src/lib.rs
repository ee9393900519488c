// Pattern pipeline
//
// A light NLP engine matching entities with per-language regular expressions:
// email addresses, titled person names and organizations with a legal-form
// suffix. It exists so the runner can be exercised end to end without model
// files; accuracy is not a goal.

pub mod model;
pub mod pattern;

pub use model::PatternModel;
pub use pattern::PatternPipeline;
