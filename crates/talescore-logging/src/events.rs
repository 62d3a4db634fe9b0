use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for a scoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    BatchStarted {
        tales: usize,
        providers: Vec<String>,
    },
    /// A provider was left out of the run before any network call
    ProviderSkipped {
        provider: String,
        reason: String,
    },
    TaleStarted {
        slug: String,
        title: String,
    },
    ModelStarted {
        slug: String,
        model: String,
    },
    ModelScored {
        slug: String,
        model: String,
        weighted_score: f64,
        rating: String,
        duration_secs: f64,
    },
    ModelFailed {
        slug: String,
        model: String,
        kind: String,
        detail: String,
    },
    /// The model's self-reported aggregate disagreed with the recomputed sum
    AggregateMismatch {
        slug: String,
        model: String,
        reported: f64,
        computed: f64,
    },
    TaleAveraged {
        slug: String,
        average: f64,
        models: usize,
    },
    BatchCompleted {
        scored: usize,
        failed: usize,
        duration_secs: f64,
    },
    Interrupted {
        scored: usize,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for scoring events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // Log to file if configured (always JSON format for file)
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::BatchStarted { tales, providers } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Scoring {} {} with {} {}",
                    "talescore".bold().bright_white(),
                    tales,
                    if *tales == 1 { "tale" } else { "tales" },
                    providers.len(),
                    if providers.len() == 1 {
                        "model"
                    } else {
                        "models"
                    }
                );
                let _ = writeln!(stderr, "  {} {}", "Models:".dimmed(), providers.join(", "));
                let _ = writeln!(stderr);
            }
            LogEvent::ProviderSkipped { provider, reason } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} skipped: {}",
                    "⏭".bright_yellow(),
                    provider,
                    reason.dimmed()
                );
            }
            LogEvent::TaleStarted { slug, title } => {
                let _ = writeln!(stderr, "{} {}", "▶".bright_blue(), title.bold());
                let _ = writeln!(stderr, "  {} {}", "slug:".dimmed(), slug.dimmed());
            }
            LogEvent::ModelStarted { model, .. } => {
                let _ = writeln!(stderr, "  {} {}...", "→".dimmed(), model);
            }
            LogEvent::ModelScored {
                model,
                weighted_score,
                rating,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}: {:.1} ({}) {}",
                    "✓".bright_green(),
                    model,
                    weighted_score,
                    rating,
                    format!("{:.1}s", duration_secs).dimmed()
                );
            }
            LogEvent::ModelFailed {
                model, kind, detail, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}: {} {}",
                    "✗".bright_red(),
                    model,
                    kind.bright_red(),
                    detail.dimmed()
                );
            }
            LogEvent::AggregateMismatch {
                model,
                reported,
                computed,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} reported {:.1} but criteria sum to {:.1}",
                    "⚠".bright_yellow(),
                    model,
                    reported,
                    computed
                );
            }
            LogEvent::TaleAveraged {
                average, models, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} Average: {:.1} ({} {})",
                    "📊".dimmed(),
                    average,
                    models,
                    if *models == 1 { "model" } else { "models" }
                );
                let _ = writeln!(stderr);
            }
            LogEvent::BatchCompleted {
                scored,
                failed,
                duration_secs,
            } => {
                let _ = writeln!(stderr);
                if *failed == 0 {
                    let _ = writeln!(
                        stderr,
                        "{} {} scored in {:.1}s",
                        "✓".bright_green(),
                        scored,
                        duration_secs
                    );
                } else {
                    let _ = writeln!(
                        stderr,
                        "{} {} scored, {} failed in {:.1}s",
                        "⚠".bright_yellow(),
                        scored,
                        failed,
                        duration_secs
                    );
                }
            }
            LogEvent::Interrupted { scored } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Interrupted after {} scored",
                    "⚠".bright_yellow(),
                    scored
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::BatchStarted { tales, providers } => {
                format!(
                    "[{}] batch:start tales={} models={}",
                    timestamp,
                    tales,
                    providers.len()
                )
            }
            LogEvent::ProviderSkipped { provider, reason } => {
                format!("[{}] skip:{} {}", timestamp, provider, reason)
            }
            LogEvent::TaleStarted { slug, .. } => format!("[{}] tale:{}", timestamp, slug),
            LogEvent::ModelStarted { slug, model } => {
                format!("[{}] model:start {}:{}", timestamp, slug, model)
            }
            LogEvent::ModelScored {
                slug,
                model,
                weighted_score,
                rating,
                ..
            } => format!(
                "[{}] model:done {}:{} {:.1} {}",
                timestamp, slug, model, weighted_score, rating
            ),
            LogEvent::ModelFailed {
                slug, model, kind, ..
            } => format!("[{}] model:fail {}:{} {}", timestamp, slug, model, kind),
            LogEvent::AggregateMismatch {
                slug,
                model,
                reported,
                computed,
            } => format!(
                "[{}] mismatch {}:{} reported={:.1} computed={:.1}",
                timestamp, slug, model, reported, computed
            ),
            LogEvent::TaleAveraged {
                slug,
                average,
                models,
            } => format!(
                "[{}] tale:avg {} {:.1} n={}",
                timestamp, slug, average, models
            ),
            LogEvent::BatchCompleted {
                scored,
                failed,
                duration_secs,
            } => format!(
                "[{}] batch:done scored={} failed={} {:.1}s",
                timestamp, scored, failed, duration_secs
            ),
            LogEvent::Interrupted { scored } => {
                format!("[{}] batch:interrupted scored={}", timestamp, scored)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::ModelScored {
            slug: "test-tale".into(),
            model: "gemini-2.5-flash".into(),
            weighted_score: 76.5,
            rating: "GOOD".into(),
            duration_secs: 4.2,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "model_scored");
        assert_eq!(value["slug"], "test-tale");
        assert_eq!(value["rating"], "GOOD");
    }

    #[test]
    fn test_file_logging_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&LogEvent::Interrupted { scored: 3 });
        logger.log(&LogEvent::BatchCompleted {
            scored: 3,
            failed: 1,
            duration_secs: 12.0,
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "interrupted");
        assert!(first["timestamp"].is_string());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("verbose".parse::<LogFormat>().is_err());
    }
}
