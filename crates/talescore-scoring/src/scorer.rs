use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use talescore_provider::{Provider, ProviderError};

use crate::extract::{extract_json, ExtractError};
use crate::prompt::PromptBuilder;
use crate::report::{ScoreReport, ValidationError};

/// Errors from scoring a single content item.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("could not extract JSON from model output: {0}")]
    Extraction(#[from] ExtractError),

    #[error("model output failed validation: {0}")]
    Validation(#[from] ValidationError),
}

impl ScoreError {
    /// Stable identifier for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreError::Provider(ProviderError::Reported { .. }) => "provider_reported_error",
            ScoreError::Provider(_) => "provider_request_failed",
            ScoreError::Extraction(_) => "extraction_failed",
            ScoreError::Validation(_) => "validation_failed",
        }
    }
}

/// The result of scoring one item with one model.
#[derive(Debug)]
pub struct ScoredItem {
    pub report: ScoreReport,
    /// Raw model output, kept for storage and diagnosis
    pub raw: String,
    /// True when the content body was truncated before prompting
    pub truncated: bool,
    pub duration: Duration,
}

/// Runs the scoring pipeline for single items against one provider.
pub struct Scorer<'a> {
    provider: &'a dyn Provider,
    prompt: PromptBuilder,
}

impl<'a> Scorer<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            prompt: PromptBuilder::new(),
        }
    }

    pub fn with_prompt(provider: &'a dyn Provider, prompt: PromptBuilder) -> Self {
        Self { provider, prompt }
    }

    /// Score one (title, content) pair: build the prompt, call the provider,
    /// recover JSON from the reply, and validate the rubric shape. Never
    /// synthesizes a partial report from an invalid parse.
    pub async fn score(&self, title: &str, content: &str) -> Result<ScoredItem, ScoreError> {
        let built = self.prompt.build(title, content);

        debug!(
            model = self.provider.name(),
            prompt_len = built.text.len(),
            truncated = built.truncated,
            "running scorer"
        );

        let start = Instant::now();
        let raw = self.provider.generate(&built.text).await?;
        let duration = start.elapsed();

        let value = extract_json(&raw).map_err(|err| {
            warn!(
                model = self.provider.name(),
                raw_preview = preview(&raw, 500),
                "failed to extract JSON from model output"
            );
            err
        })?;

        let report = ScoreReport::from_value(&value)?;

        info!(
            model = self.provider.name(),
            weighted_score = report.weighted_score,
            rating = %report.rating,
            duration_secs = duration.as_secs_f64(),
            "scored"
        );

        Ok(ScoredItem {
            report,
            raw,
            truncated: built.truncated,
            duration,
        })
    }
}

/// First `max` characters of a string, for log lines.
fn preview(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use talescore_provider::ProviderKind;

    struct CannedProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned-model"
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Google
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.reply.clone())
        }
    }

    fn valid_reply() -> String {
        r#"```json
{
  "scores": {
    "titlePower": {"score": 80, "feedback": "ok"},
    "humanVoice": {"score": 80, "feedback": "ok"},
    "contentQuality": {"score": 80, "feedback": "ok"},
    "visualEngagement": {"score": 80, "feedback": "ok"},
    "technicalSeo": {"score": 80, "feedback": "ok"},
    "internalEcosystem": {"score": 80, "feedback": "ok"},
    "aiVisibility": {"score": 80, "feedback": "ok"}
  },
  "weightedScore": 80.0,
  "rating": "EXCELLENT"
}
```"#
            .to_string()
    }

    #[tokio::test]
    async fn test_score_happy_path_through_fenced_reply() {
        let provider = CannedProvider {
            reply: valid_reply(),
        };
        let scorer = Scorer::new(&provider);

        let item = scorer.score("Test", "Short sample text.").await.unwrap();
        assert!((item.report.weighted_score - 80.0).abs() < 1e-9);
        assert!(!item.truncated);
        assert_eq!(item.raw, valid_reply());
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_extraction_error() {
        let provider = CannedProvider {
            reply: "I cannot score this content.".to_string(),
        };
        let scorer = Scorer::new(&provider);

        let err = scorer.score("Test", "Body").await.unwrap_err();
        assert!(matches!(err, ScoreError::Extraction(_)));
        assert_eq!(err.kind(), "extraction_failed");
    }

    #[tokio::test]
    async fn test_partial_report_is_validation_error() {
        let provider = CannedProvider {
            reply: r#"{"scores": {"titlePower": {"score": 80}}, "weightedScore": 80, "rating": "GOOD"}"#
                .to_string(),
        };
        let scorer = Scorer::new(&provider);

        let err = scorer.score("Test", "Body").await.unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)));
        assert_eq!(err.kind(), "validation_failed");
    }
}
