//! Score report validation.
//!
//! Model output is untrusted input: validation is explicit and names the
//! specific defect rather than returning a boolean.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::rubric::{Criterion, Rating};

/// Tolerance between the model's self-reported aggregate and the recomputed
/// weighted sum of its own sub-scores.
pub const AGGREGATE_TOLERANCE: f64 = 0.5;

/// One rubric entry's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionScore {
    pub score: f64,
    pub feedback: Option<String>,
}

/// A prioritized improvement suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Improvement {
    pub priority: Option<u64>,
    pub action: String,
    pub impact: Option<String>,
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("response has no `scores` object")]
    MissingScores,

    #[error("missing rubric criterion `{0}`")]
    MissingCriterion(&'static str),

    #[error("criterion `{0}` has a missing or non-numeric score")]
    NonNumericScore(&'static str),

    #[error("criterion `{criterion}` score {value} is outside 0-100")]
    ScoreOutOfRange { criterion: &'static str, value: f64 },

    #[error("`weightedScore` is missing or non-numeric")]
    MissingWeightedScore,

    #[error("`weightedScore` {0} is outside 0-100")]
    WeightedScoreOutOfRange(f64),

    #[error("`rating` is missing or not a string")]
    MissingRating,

    #[error("unknown rating label `{0}`")]
    UnknownRating(String),
}

/// The validated result of one scoring call. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    /// Criterion key -> score
    pub scores: BTreeMap<&'static str, CriterionScore>,
    /// The model's self-reported weighted aggregate
    pub weighted_score: f64,
    pub rating: Rating,
    pub top_strengths: Vec<String>,
    pub top_weaknesses: Vec<String>,
    pub improvements: Vec<Improvement>,
    /// Recomputed weighted sum, present only when it disagrees with
    /// `weighted_score` by more than [`AGGREGATE_TOLERANCE`]. A quality
    /// signal about the model's arithmetic, not a hard failure.
    pub aggregate_mismatch: Option<f64>,
}

impl ScoreReport {
    /// Validate a parsed JSON value against the rubric shape.
    ///
    /// All seven criterion keys must be present with in-range numeric
    /// scores; partial reports are failures, and out-of-range values are
    /// rejected rather than clamped.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let scores_obj = value
            .get("scores")
            .and_then(|v| v.as_object())
            .ok_or(ValidationError::MissingScores)?;

        let mut scores = BTreeMap::new();
        for criterion in Criterion::ALL {
            let key = criterion.key();
            let entry = scores_obj
                .get(key)
                .ok_or(ValidationError::MissingCriterion(key))?;
            let score = entry
                .get("score")
                .and_then(|v| v.as_f64())
                .ok_or(ValidationError::NonNumericScore(key))?;
            if !(0.0..=100.0).contains(&score) {
                return Err(ValidationError::ScoreOutOfRange {
                    criterion: key,
                    value: score,
                });
            }
            let feedback = entry
                .get("feedback")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            scores.insert(key, CriterionScore { score, feedback });
        }

        let weighted_score = value
            .get("weightedScore")
            .and_then(|v| v.as_f64())
            .ok_or(ValidationError::MissingWeightedScore)?;
        if !(0.0..=100.0).contains(&weighted_score) {
            return Err(ValidationError::WeightedScoreOutOfRange(weighted_score));
        }

        let rating_label = value
            .get("rating")
            .and_then(|v| v.as_str())
            .ok_or(ValidationError::MissingRating)?;
        let rating = rating_label
            .parse()
            .map_err(|_| ValidationError::UnknownRating(rating_label.to_string()))?;

        let computed: f64 = Criterion::ALL
            .iter()
            .map(|c| scores[c.key()].score * c.weight())
            .sum();
        let aggregate_mismatch =
            ((computed - weighted_score).abs() > AGGREGATE_TOLERANCE).then_some(computed);

        Ok(Self {
            scores,
            weighted_score,
            rating,
            top_strengths: string_list(value, "topStrengths"),
            top_weaknesses: string_list(value, "topWeaknesses"),
            improvements: improvements(value),
            aggregate_mismatch,
        })
    }

    /// The weighted sum recomputed from the sub-scores.
    pub fn recomputed_weighted_score(&self) -> f64 {
        Criterion::ALL
            .iter()
            .map(|c| self.scores[c.key()].score * c.weight())
            .sum()
    }
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Improvement suggestions are optional and lenient; the source emits them
/// under two different keys depending on the prompt version.
fn improvements(value: &Value) -> Vec<Improvement> {
    let items = value
        .get("improvements")
        .or_else(|| value.get("prioritizedImprovements"))
        .and_then(|v| v.as_array());

    items
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let action = item.get("action")?.as_str()?.to_string();
                    Some(Improvement {
                        priority: item.get("priority").and_then(|v| v.as_u64()),
                        action,
                        impact: item
                            .get("impact")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
