mod extract;
mod prompt;
mod report;
mod rubric;
pub mod scorer;

pub use extract::{extract_json, ExtractError};
pub use prompt::{BuiltPrompt, PromptBuilder, DEFAULT_CONTENT_BUDGET};
pub use report::{
    CriterionScore, Improvement, ScoreReport, ValidationError, AGGREGATE_TOLERANCE,
};
pub use rubric::{Criterion, Rating};
pub use scorer::{ScoreError, ScoredItem, Scorer};
