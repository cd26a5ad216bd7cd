//! LLM module - Language Model integrations
//!
//! Provides the provider abstraction plus Gemini and Ollama backends.

pub mod gemini;
pub mod ollama;
pub mod traits;

use std::sync::Arc;

use crate::core::{Config, ProviderType, Result};

pub use gemini::GeminiProvider;
pub use ollama::OllamaClient;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

/// Create the configured LLM provider.
///
/// A missing model credential is a fatal startup error.
pub fn create_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.provider {
        ProviderType::Gemini => Arc::new(GeminiProvider::from_config(config)?),
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
    };
    tracing::info!(provider = provider.name(), model = provider.model(), "model provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_provider() {
        let mut config = Config::default();
        config.provider = ProviderType::Ollama;
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_gemini_without_key_fails() {
        let mut config = Config::default();
        config.provider = ProviderType::Gemini;
        config.gemini.api_key = None;
        assert!(create_provider(&config).is_err());
    }
}
