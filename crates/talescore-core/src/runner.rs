use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use talescore_db::{Database, ProviderKeys, ScoreRow, TaleFilter, TaleRecord};
use talescore_logging::{LogEvent, Logger};
use talescore_provider::{create_provider, Provider, ProviderConfig, ProviderKind};
use talescore_scoring::{PromptBuilder, Rating, ScoredItem, Scorer, DEFAULT_CONTENT_BUDGET};

use crate::error::BatchError;
use crate::outcome::{BatchSummary, ModelScore, TaleResult};

/// Settings for one scoring run.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Backends to score with, in order
    pub providers: Vec<ProviderKind>,
    pub provider_config: ProviderConfig,
    /// Character budget for content interpolated into the prompt
    pub content_budget: usize,
    /// Restrict the run to a single tale
    pub slug: Option<String>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            providers: ProviderKind::ALL.to_vec(),
            provider_config: ProviderConfig::default(),
            content_budget: DEFAULT_CONTENT_BUDGET,
            slug: None,
        }
    }
}

/// Orchestrates a scoring run: tales x providers, sequentially.
///
/// Any single (tale, model) failure is logged and skipped; only database
/// errors and misconfiguration abort the run.
pub struct BatchRunner {
    db: Arc<Database>,
    logger: Arc<Logger>,
    settings: BatchSettings,
    interrupted: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(db: Arc<Database>, logger: Arc<Logger>, settings: BatchSettings) -> Self {
        Self {
            db,
            logger,
            settings,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Run the batch until completion or interruption.
    pub async fn run(&self) -> Result<BatchSummary, BatchError> {
        let started = Instant::now();

        let tales = self.db.tales().list_published(&TaleFilter {
            slug: self.settings.slug.clone(),
        })?;
        if tales.is_empty() {
            return match &self.settings.slug {
                Some(slug) => Err(BatchError::TaleNotFound(slug.clone())),
                None => Err(BatchError::NoTales),
            };
        }

        let providers = self.build_providers()?;
        self.logger.log(&LogEvent::BatchStarted {
            tales: tales.len(),
            providers: providers.iter().map(|p| p.name().to_string()).collect(),
        });

        let prompt = PromptBuilder::new().with_content_budget(self.settings.content_budget);

        let mut scored = 0usize;
        let mut failed = 0usize;
        let mut results = Vec::with_capacity(tales.len());

        for tale in &tales {
            if self.interrupted.load(Ordering::SeqCst) {
                self.logger.log(&LogEvent::Interrupted { scored });
                return Ok(BatchSummary::interrupted(
                    scored,
                    failed,
                    results,
                    started.elapsed(),
                ));
            }

            self.logger.log(&LogEvent::TaleStarted {
                slug: tale.slug.clone(),
                title: tale.title.clone(),
            });

            let mut model_scores = Vec::new();
            for provider in &providers {
                match self.score_one(tale, provider.as_ref(), &prompt).await {
                    Ok(model_score) => {
                        scored += 1;
                        model_scores.push(model_score);
                    }
                    Err(ModelOutcome::Skipped) => failed += 1,
                    Err(ModelOutcome::Fatal(err)) => return Err(err),
                }
            }

            let average = self.write_average(tale, &model_scores)?;
            results.push(TaleResult {
                slug: tale.slug.clone(),
                title: tale.title.clone(),
                average,
                models: model_scores,
            });
        }

        self.logger.log(&LogEvent::BatchCompleted {
            scored,
            failed,
            duration_secs: started.elapsed().as_secs_f64(),
        });

        Ok(BatchSummary::completed(
            scored,
            failed,
            results,
            started.elapsed(),
        ))
    }

    /// Resolve credentials once and build one provider per configured
    /// backend with a key present. Missing credentials never reach the
    /// network; the backend is skipped up front.
    fn build_providers(&self) -> Result<Vec<Box<dyn Provider>>, BatchError> {
        let keys = self.db.credentials().provider_keys()?;

        let mut providers = Vec::new();
        for kind in &self.settings.providers {
            match key_for(&keys, *kind) {
                Some(key) => {
                    providers.push(create_provider(*kind, &self.settings.provider_config, key)?)
                }
                None => self.logger.log(&LogEvent::ProviderSkipped {
                    provider: kind.to_string(),
                    reason: format!("missing credential `{}`", kind.credential_name()),
                }),
            }
        }

        if providers.is_empty() {
            return Err(BatchError::NoCredentials);
        }
        Ok(providers)
    }

    async fn score_one(
        &self,
        tale: &TaleRecord,
        provider: &dyn Provider,
        prompt: &PromptBuilder,
    ) -> Result<ModelScore, ModelOutcome> {
        self.logger.log(&LogEvent::ModelStarted {
            slug: tale.slug.clone(),
            model: provider.name().to_string(),
        });

        let scorer = Scorer::with_prompt(provider, prompt.clone());
        let item = match scorer.score(&tale.title, &tale.content).await {
            Ok(item) => item,
            Err(err) => {
                self.logger.log(&LogEvent::ModelFailed {
                    slug: tale.slug.clone(),
                    model: provider.name().to_string(),
                    kind: err.kind().to_string(),
                    detail: err.to_string(),
                });
                return Err(ModelOutcome::Skipped);
            }
        };

        if let Some(computed) = item.report.aggregate_mismatch {
            self.logger.log(&LogEvent::AggregateMismatch {
                slug: tale.slug.clone(),
                model: provider.name().to_string(),
                reported: item.report.weighted_score,
                computed,
            });
        }

        self.persist_score(tale, provider, &item)
            .map_err(ModelOutcome::Fatal)?;

        self.logger.log(&LogEvent::ModelScored {
            slug: tale.slug.clone(),
            model: provider.name().to_string(),
            weighted_score: item.report.weighted_score,
            rating: item.report.rating.to_string(),
            duration_secs: item.duration.as_secs_f64(),
        });

        Ok(ModelScore {
            model: provider.name().to_string(),
            provider: provider.kind().to_string(),
            weighted_score: item.report.weighted_score,
            rating: item.report.rating.to_string(),
        })
    }

    fn persist_score(
        &self,
        tale: &TaleRecord,
        provider: &dyn Provider,
        item: &ScoredItem,
    ) -> Result<(), BatchError> {
        let report = &item.report;
        let row = ScoreRow {
            tale_id: tale.id.clone(),
            model: provider.name().to_string(),
            provider: provider.kind().to_string(),
            weighted_score: report.weighted_score,
            rating: report.rating.to_string(),
            breakdown: serde_json::to_string(&report.scores)?,
            top_strengths: optional_json(&report.top_strengths)?,
            top_weaknesses: optional_json(&report.top_weaknesses)?,
            improvements: if report.improvements.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&report.improvements)?)
            },
            raw_response: item.raw.clone(),
            scored_at: Utc::now(),
        };
        self.db.scores().upsert(&row)?;

        debug!(slug = %tale.slug, model = provider.name(), "score row persisted");
        Ok(())
    }

    /// Average the successful model scores and write them back to the tale.
    fn write_average(
        &self,
        tale: &TaleRecord,
        model_scores: &[ModelScore],
    ) -> Result<Option<f64>, BatchError> {
        if model_scores.is_empty() {
            warn!(slug = %tale.slug, "no model produced a score for this tale");
            return Ok(None);
        }

        let average = model_scores
            .iter()
            .map(|m| m.weighted_score)
            .sum::<f64>()
            / model_scores.len() as f64;

        let breakdown = json!({
            "models": model_scores,
            "average": average,
            "rating": Rating::from_score(average).as_str(),
            "scoredAt": Utc::now().to_rfc3339(),
        });
        self.db
            .tales()
            .set_average_score(&tale.id, average, &breakdown.to_string())?;

        self.logger.log(&LogEvent::TaleAveraged {
            slug: tale.slug.clone(),
            average,
            models: model_scores.len(),
        });

        Ok(Some(average))
    }
}

/// Internal control flow for one (tale, model) attempt.
enum ModelOutcome {
    /// Item-level failure, already logged; the batch continues
    Skipped,
    /// Run-level failure (database, serialization)
    Fatal(BatchError),
}

fn optional_json(values: &[String]) -> Result<Option<String>, serde_json::Error> {
    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(values)?))
    }
}

fn key_for(keys: &ProviderKeys, kind: ProviderKind) -> Option<String> {
    match kind {
        ProviderKind::Google => keys.google.clone(),
        ProviderKind::Anthropic => keys.anthropic.clone(),
        ProviderKind::OpenAi => keys.openai.clone(),
        ProviderKind::Xai => keys.grok.clone(),
    }
}
