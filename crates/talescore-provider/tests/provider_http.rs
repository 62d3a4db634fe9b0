use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use talescore_provider::{
    create_provider, Provider, ProviderConfig, ProviderError, ProviderKind,
};

fn config_for(server: &MockServer) -> ProviderConfig {
    ProviderConfig::default()
        .with_base_url(server.base_url())
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn gemini_happy_path_extracts_candidate_text() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent")
            .query_param("key", "test-key");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"weightedScore\": 76.5}" }] }
            }]
        }));
    });

    let provider = gemini(&server);
    let text = provider.generate("score this").await.unwrap();

    mock.assert();
    assert_eq!(text, "{\"weightedScore\": 76.5}");
}

#[tokio::test]
async fn gemini_http_200_with_error_body_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200)
            .json_body(json!({ "error": { "message": "quota exceeded" } }));
    });

    let provider = gemini(&server);
    let err = provider.generate("score this").await.unwrap_err();

    match err {
        ProviderError::Reported { message, .. } => assert_eq!(message, "quota exceeded"),
        other => panic!("expected Reported, got {other:?}"),
    }
}

#[tokio::test]
async fn gemini_missing_text_path_is_empty_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{ "finishReason": "MAX_TOKENS" }]
        }));
    });

    let provider = gemini(&server);
    let err = provider.generate("score this").await.unwrap_err();

    assert!(matches!(err, ProviderError::EmptyResponse { .. }));
}

#[tokio::test]
async fn non_2xx_status_carries_status_and_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(503).body("upstream unavailable");
    });

    let provider = gemini(&server);
    let err = provider.generate("score this").await.unwrap_err();

    match err {
        ProviderError::HttpStatus { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "upstream unavailable");
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn openai_happy_path_extracts_message_content() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-test");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "role": "assistant", "content": "{}" } }]
        }));
    });

    let provider =
        create_provider(ProviderKind::OpenAi, &config_for(&server), "sk-test".into()).unwrap();
    let text = provider.generate("score this").await.unwrap();

    mock.assert();
    assert_eq!(text, "{}");
}

#[tokio::test]
async fn anthropic_happy_path_sends_version_header() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/messages")
            .header("x-api-key", "ant-test")
            .header("anthropic-version", "2023-06-01");
        then.status(200).json_body(json!({
            "content": [{ "type": "text", "text": "scored" }]
        }));
    });

    let provider = create_provider(
        ProviderKind::Anthropic,
        &config_for(&server),
        "ant-test".into(),
    )
    .unwrap();
    let text = provider.generate("score this").await.unwrap();

    mock.assert();
    assert_eq!(text, "scored");
}

#[tokio::test]
async fn xai_uses_chat_completions_wire_format() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "content": "grok says" } }]
        }));
    });

    let provider =
        create_provider(ProviderKind::Xai, &config_for(&server), "xai-test".into()).unwrap();
    assert_eq!(provider.kind(), ProviderKind::Xai);
    assert_eq!(provider.name(), "grok-3");
    assert_eq!(provider.generate("score this").await.unwrap(), "grok says");
}

fn gemini(server: &MockServer) -> Box<dyn Provider> {
    create_provider(ProviderKind::Google, &config_for(server), "test-key".into()).unwrap()
}
