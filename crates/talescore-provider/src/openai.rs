use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::debug;

use crate::traits::reported_error;
use crate::{Provider, ProviderConfig, ProviderError, ProviderKind};

/// Chat-completions client for OpenAI and wire-compatible backends (xAI).
///
/// Generated text sits at `choices[0].message.content`.
pub struct OpenAiCompatProvider {
    kind: ProviderKind,
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f64,
    max_output_tokens: u32,
    timeout: Duration,
}

impl OpenAiCompatProvider {
    pub fn new(
        kind: ProviderKind,
        config: &ProviderConfig,
        api_key: String,
    ) -> Result<Self, ProviderError> {
        debug_assert!(matches!(kind, ProviderKind::OpenAi | ProviderKind::Xai));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ProviderError::ClientBuild)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| kind.default_base_url().to_string());
        let endpoint = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));

        Ok(Self {
            kind,
            client,
            api_key,
            endpoint,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| kind.default_model().to_string()),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: config.timeout,
        })
    }

    fn request_body(&self, prompt: &str) -> JsonValue {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let provider = self.model.as_str();

        debug!(
            model = provider,
            backend = %self.kind,
            prompt_len = prompt.len(),
            "calling chat completions"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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

        if let Some(message) = reported_error(&body) {
            return Err(ProviderError::Reported {
                provider: provider.to_string(),
                message,
            });
        }

        body.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .filter(|text| !text.is_empty())
            .map(|text| text.to_string())
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: provider.to_string(),
            })
    }
}
