//! Provider module for Confide
//!
//! This module contains the language-model provider abstraction and the
//! OpenAI-compatible implementation.

pub mod base;
pub mod openai;

pub use base::{ChatMessage, CompletionParams, FragmentStream, Provider};
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::Result;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
///
/// # Returns
///
/// Returns a boxed provider instance
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Box::new(OpenAiProvider::new(config.openai.clone())?)),
        other => Err(crate::error::ConfideError::Provider(format!(
            "Unknown provider type: {}",
            other
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;

    #[test]
    fn test_create_provider_invalid_type() {
        let config = ProviderConfig {
            provider_type: "invalid".to_string(),
            openai: OpenAiConfig::default(),
        };

        let result = create_provider(&config);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_provider_openai() {
        std::env::set_var("CONFIDE_FACTORY_TEST_KEY", "test-key");
        let config = ProviderConfig {
            provider_type: "openai".to_string(),
            openai: OpenAiConfig {
                api_key_env: "CONFIDE_FACTORY_TEST_KEY".to_string(),
                ..OpenAiConfig::default()
            },
        };

        let result = create_provider(&config);
        assert!(result.is_ok());
    }
}
