use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling a provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request to {provider} failed: {source}")]
    RequestFailed {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("{provider} returned HTTP {status}: {body}")]
    HttpStatus {
        provider: String,
        status: u16,
        body: String,
    },

    /// The provider embedded an error payload in an otherwise-OK response.
    /// Gemini is known to do this with HTTP 200.
    #[error("{provider} reported an error: {message}")]
    Reported { provider: String, message: String },

    #[error("{provider} response contained no generated text")]
    EmptyResponse { provider: String },
}

impl ProviderError {
    /// Map a transport-level reqwest error, distinguishing timeouts.
    pub(crate) fn from_reqwest(provider: &str, err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider: provider.to_string(),
                timeout,
            }
        } else {
            ProviderError::RequestFailed {
                provider: provider.to_string(),
                source: err,
            }
        }
    }
}

/// Configuration for provider calls
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Model identifier override (each provider has a default)
    pub model: Option<String>,
    /// Sampling temperature; kept low to bias toward structured output
    pub temperature: f64,
    /// Maximum tokens in the generated reply
    pub max_output_tokens: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Base URL override (tests, proxies)
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            max_output_tokens: 4000,
            timeout: Duration::from_secs(30),
            base_url: None,
        }
    }
}

impl ProviderConfig {
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    Anthropic,
    OpenAi,
    Xai,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Google,
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::Xai,
    ];

    /// The logical credential name this backend is keyed by.
    pub fn credential_name(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google_generative_ai_key",
            ProviderKind::Anthropic => "anthropic_api_key",
            ProviderKind::OpenAi => "openai_api_key",
            ProviderKind::Xai => "grok_api_key",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Google => "gemini-2.5-flash",
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Xai => "grok-3",
        }
    }

    pub(crate) fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://generativelanguage.googleapis.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Xai => "https://api.x.ai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Google => write!(f, "google"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Xai => write!(f, "xai"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Ok(ProviderKind::Google),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            "xai" | "grok" => Ok(ProviderKind::Xai),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// The core abstraction over text-generation backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Model identifier used in logs and score records (e.g., "gemini-2.5-flash")
    fn name(&self) -> &str;

    /// The backend kind
    fn kind(&self) -> ProviderKind;

    /// Send a prompt and return the raw generated text
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Extract a human-readable message from an `error` payload embedded in a
/// response body.
pub(crate) fn reported_error(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error")?;
    Some(
        error
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| error.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("grok".parse::<ProviderKind>().unwrap(), ProviderKind::Xai);
        assert!("mistral".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_credential_names_match_store() {
        assert_eq!(
            ProviderKind::Google.credential_name(),
            "google_generative_ai_key"
        );
        assert_eq!(ProviderKind::Xai.credential_name(), "grok_api_key");
    }

    #[test]
    fn test_reported_error_prefers_message() {
        let body = serde_json::json!({"error": {"message": "quota exceeded", "code": 429}});
        assert_eq!(reported_error(&body).unwrap(), "quota exceeded");

        let bare = serde_json::json!({"error": "bad things"});
        assert_eq!(reported_error(&bare).unwrap(), "\"bad things\"");

        let ok = serde_json::json!({"candidates": []});
        assert!(reported_error(&ok).is_none());
    }
}
