use chrono::Utc;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use talescore_core::{BatchError, BatchRunner, BatchSettings};
use talescore_db::{Database, TaleRecord};
use talescore_logging::{LogFormat, Logger};
use talescore_provider::{ProviderConfig, ProviderKind};

fn seeded_db(slugs: &[&str]) -> Arc<Database> {
    let db = Database::open_in_memory().unwrap();
    for slug in slugs {
        db.tales()
            .save(&TaleRecord {
                id: format!("id-{}", slug),
                slug: slug.to_string(),
                title: format!("Title {}", slug),
                excerpt: None,
                content: "Short sample text.".to_string(),
                status: "published".to_string(),
                stepten_score: None,
                score_breakdown: None,
                updated_at: Utc::now(),
            })
            .unwrap();
    }
    Arc::new(db)
}

fn settings_for(server: &MockServer, providers: Vec<ProviderKind>) -> BatchSettings {
    BatchSettings {
        providers,
        provider_config: ProviderConfig::default()
            .with_base_url(server.base_url())
            .with_timeout(Duration::from_secs(5)),
        ..BatchSettings::default()
    }
}

fn gemini_body(weighted: f64, rating: &str) -> serde_json::Value {
    let report = json!({
        "scores": {
            "titlePower": {"score": 80, "feedback": "ok"},
            "humanVoice": {"score": 80, "feedback": "ok"},
            "contentQuality": {"score": 80, "feedback": "ok"},
            "visualEngagement": {"score": 80, "feedback": "ok"},
            "technicalSeo": {"score": 80, "feedback": "ok"},
            "internalEcosystem": {"score": 80, "feedback": "ok"},
            "aiVisibility": {"score": 80, "feedback": "ok"}
        },
        "weightedScore": weighted,
        "rating": rating,
        "topStrengths": ["voice"]
    });
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": report.to_string() }] }
        }]
    })
}

fn valid_gemini_body() -> serde_json::Value {
    gemini_body(80.0, "EXCELLENT")
}

#[tokio::test]
async fn missing_credential_skips_provider_without_network_calls() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });

    let db = seeded_db(&["lonely-tale"]);
    let logger = Arc::new(Logger::new(LogFormat::Compact));
    let runner = BatchRunner::new(
        db,
        logger,
        settings_for(&server, vec![ProviderKind::Google]),
    );

    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, BatchError::NoCredentials));
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn successful_run_persists_scores_and_average() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200).json_body(valid_gemini_body());
    });

    let db = seeded_db(&["tale-a", "tale-b"]);
    db.credentials()
        .set("google_generative_ai_key", "test-key")
        .unwrap();

    let logger = Arc::new(Logger::new(LogFormat::Compact));
    let runner = BatchRunner::new(
        db.clone(),
        logger,
        settings_for(&server, vec![ProviderKind::Google]),
    );

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.scored(), 2);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.exit_code(), 0);

    let rows = db.scores().for_tale("id-tale-a").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].model, "gemini-2.5-flash");
    assert_eq!(rows[0].rating, "EXCELLENT");

    let tale = db.tales().get_by_slug("tale-a").unwrap().unwrap();
    let average = tale.stepten_score.expect("average should be written back");
    assert!((average - 80.0).abs() < 1e-9);
    assert!(tale.score_breakdown.unwrap().contains("gemini-2.5-flash"));
}

#[tokio::test]
async fn provider_reported_error_is_skipped_not_fatal() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200)
            .json_body(json!({ "error": { "message": "quota exceeded" } }));
    });

    let db = seeded_db(&["quota-tale"]);
    db.credentials()
        .set("google_generative_ai_key", "test-key")
        .unwrap();

    let logger = Arc::new(Logger::new(LogFormat::Compact));
    let runner = BatchRunner::new(
        db.clone(),
        logger,
        settings_for(&server, vec![ProviderKind::Google]),
    );

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.scored(), 0);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.exit_code(), 2);

    // No partial report was synthesized
    assert!(db.scores().for_tale("id-quota-tale").unwrap().is_empty());
    let tale = db.tales().get_by_slug("quota-tale").unwrap().unwrap();
    assert!(tale.stepten_score.is_none());
}

#[tokio::test]
async fn slug_filter_restricts_run_and_missing_slug_errors() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200).json_body(valid_gemini_body());
    });

    let db = seeded_db(&["tale-a", "tale-b"]);
    db.credentials()
        .set("google_generative_ai_key", "test-key")
        .unwrap();
    let logger = Arc::new(Logger::new(LogFormat::Compact));

    let mut settings = settings_for(&server, vec![ProviderKind::Google]);
    settings.slug = Some("tale-b".to_string());
    let runner = BatchRunner::new(db.clone(), logger.clone(), settings);

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.scored(), 1);
    assert_eq!(summary.results().len(), 1);
    assert_eq!(summary.results()[0].slug, "tale-b");
    assert_eq!(mock.hits(), 1);

    let mut missing = settings_for(&server, vec![ProviderKind::Google]);
    missing.slug = Some("no-such-tale".to_string());
    let runner = BatchRunner::new(db, logger, missing);
    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, BatchError::TaleNotFound(slug) if slug == "no-such-tale"));
}

#[tokio::test]
async fn aggregate_mismatch_is_logged_but_run_succeeds() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        // Criteria all at 80 recompute to 80; the model claims 70
        then.status(200).json_body(gemini_body(70.0, "GOOD"));
    });

    let db = seeded_db(&["mismatch-tale"]);
    db.credentials()
        .set("google_generative_ai_key", "test-key")
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("run.log");
    let logger = Arc::new(Logger::with_file(LogFormat::Compact, &log_path).unwrap());
    let runner = BatchRunner::new(
        db.clone(),
        logger,
        settings_for(&server, vec![ProviderKind::Google]),
    );

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.scored(), 1);
    assert_eq!(summary.failed(), 0);

    // The model's self-reported aggregate is kept
    let rows = db.scores().for_tale("id-mismatch-tale").unwrap();
    assert!((rows[0].weighted_score - 70.0).abs() < 1e-9);

    let log = std::fs::read_to_string(&log_path).unwrap();
    let mismatch = log
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|event| event["event"] == "aggregate_mismatch")
        .expect("mismatch event should be logged");
    assert!((mismatch["reported"].as_f64().unwrap() - 70.0).abs() < 1e-9);
    assert!((mismatch["computed"].as_f64().unwrap() - 80.0).abs() < 1e-9);
}

#[tokio::test]
async fn interruption_before_first_tale_returns_interrupted_summary() {
    let server = MockServer::start();
    let db = seeded_db(&["tale-a"]);
    db.credentials()
        .set("google_generative_ai_key", "test-key")
        .unwrap();

    let logger = Arc::new(Logger::new(LogFormat::Compact));
    let runner = BatchRunner::new(
        db,
        logger,
        settings_for(&server, vec![ProviderKind::Google]),
    );
    runner.interrupt_handle().store(true, Ordering::SeqCst);

    let summary = runner.run().await.unwrap();
    assert!(summary.is_interrupted());
    assert_eq!(summary.exit_code(), 130);
}
