use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::debug;

use crate::traits::reported_error;
use crate::{Provider, ProviderConfig, ProviderError, ProviderKind};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client. Generated text sits at `content[0].text`.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f64,
    max_output_tokens: u32,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ProviderError::ClientBuild)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ProviderKind::Anthropic.default_base_url().to_string());
        let endpoint = format!("{}/v1/messages", base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| ProviderKind::Anthropic.default_model().to_string()),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: config.timeout,
        })
    }

    fn request_body(&self, prompt: &str) -> JsonValue {
        json!({
            "model": self.model,
            "max_tokens": self.max_output_tokens,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let provider = self.model.as_str();

        debug!(
            model = provider,
            prompt_len = prompt.len(),
            "calling Anthropic"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        body.pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .filter(|text| !text.is_empty())
            .map(|text| text.to_string())
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: provider.to_string(),
            })
    }
}
