mod anthropic;
mod gemini;
mod openai;
mod traits;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatProvider;
pub use traits::{Provider, ProviderConfig, ProviderError, ProviderKind};

/// Create a provider by kind
pub fn create_provider(
    kind: ProviderKind,
    config: &ProviderConfig,
    api_key: String,
) -> Result<Box<dyn Provider>, ProviderError> {
    match kind {
        ProviderKind::Google => Ok(Box::new(GeminiProvider::new(config, api_key)?)),
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::new(config, api_key)?)),
        ProviderKind::OpenAi | ProviderKind::Xai => {
            Ok(Box::new(OpenAiCompatProvider::new(kind, config, api_key)?))
        }
    }
}
