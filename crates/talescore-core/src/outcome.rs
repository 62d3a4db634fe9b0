use serde::Serialize;
use std::time::Duration;

/// One model's contribution to a tale's result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelScore {
    pub model: String,
    pub provider: String,
    pub weighted_score: f64,
    pub rating: String,
}

/// Per-tale outcome of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaleResult {
    pub slug: String,
    pub title: String,
    /// Average weighted score across the models that succeeded
    pub average: Option<f64>,
    pub models: Vec<ModelScore>,
}

/// The final outcome of a scoring run
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchSummary {
    /// Run visited every selected tale
    Completed {
        scored: usize,
        failed: usize,
        results: Vec<TaleResult>,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    Interrupted {
        scored: usize,
        failed: usize,
        results: Vec<TaleResult>,
        total_duration_secs: f64,
    },
}

impl BatchSummary {
    pub fn completed(
        scored: usize,
        failed: usize,
        results: Vec<TaleResult>,
        duration: Duration,
    ) -> Self {
        Self::Completed {
            scored,
            failed,
            results,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(
        scored: usize,
        failed: usize,
        results: Vec<TaleResult>,
        duration: Duration,
    ) -> Self {
        Self::Interrupted {
            scored,
            failed,
            results,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn scored(&self) -> usize {
        match self {
            Self::Completed { scored, .. } => *scored,
            Self::Interrupted { scored, .. } => *scored,
        }
    }

    pub fn failed(&self) -> usize {
        match self {
            Self::Completed { failed, .. } => *failed,
            Self::Interrupted { failed, .. } => *failed,
        }
    }

    pub fn results(&self) -> &[TaleResult] {
        match self {
            Self::Completed { results, .. } => results,
            Self::Interrupted { results, .. } => results,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { scored, .. } => {
                if *scored > 0 {
                    0
                } else {
                    2
                }
            }
            Self::Interrupted { .. } => 130,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let ok = BatchSummary::completed(3, 1, vec![], Duration::from_secs(5));
        assert_eq!(ok.exit_code(), 0);

        let nothing = BatchSummary::completed(0, 2, vec![], Duration::from_secs(5));
        assert_eq!(nothing.exit_code(), 2);

        let stopped = BatchSummary::interrupted(1, 0, vec![], Duration::from_secs(5));
        assert_eq!(stopped.exit_code(), 130);
        assert!(stopped.is_interrupted());
    }

    #[test]
    fn test_summary_serializes_with_status_tag() {
        let summary = BatchSummary::completed(1, 0, vec![], Duration::from_secs(2));
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["scored"], 1);
    }
}
