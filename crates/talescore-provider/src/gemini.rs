use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::debug;

use crate::traits::reported_error;
use crate::{Provider, ProviderConfig, ProviderError, ProviderKind};

/// Gemini `generateContent` client.
///
/// The API key travels as a query parameter and the generated text sits at
/// `candidates[0].content.parts[0].text`. A top-level `error` field can be
/// present even with HTTP 200 and must be checked before text extraction.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_output_tokens: u32,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ProviderError::ClientBuild)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ProviderKind::Google.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            api_key,
            base_url,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| ProviderKind::Google.default_model().to_string()),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: config.timeout,
        })
    }

    fn request_body(&self, prompt: &str) -> JsonValue {
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
        })
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let provider = self.model.as_str();
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        debug!(model = provider, prompt_len = prompt.len(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(provider, err, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                provider: provider.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|err| ProviderError::from_reqwest(provider, err, self.timeout))?;

        // Gemini can answer HTTP 200 with an error payload in the body
        if let Some(message) = reported_error(&body) {
            return Err(ProviderError::Reported {
                provider: provider.to_string(),
                message,
            });
        }

        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .filter(|text| !text.is_empty())
            .map(|text| text.to_string())
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: provider.to_string(),
            })
    }
}
