//! Provider factory.
//!
//! Creates the configured LLM provider, resolving the API key from the
//! environment or the config file.

use crate::config::Config;
use crate::provider::{GeminiProvider, LlmProvider, ProviderError};

/// Environment variable holding the Gemini API key.
const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Create an LLM provider based on configuration.
///
/// # Errors
///
/// - [`ProviderError::UnknownProvider`] if `config.provider` is not "gemini"
/// - [`ProviderError::MissingApiKey`] if no API key is found
///
/// # Examples
///
/// ```no_run
/// use gemibot_core::config::Config;
/// use gemibot_core::provider::create_provider;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::load(None)?;
/// let provider = create_provider(&config)?;
/// # Ok(())
/// # }
/// ```
pub fn create_provider(config: &Config) -> Result<Box<dyn LlmProvider>, ProviderError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = resolve_api_key(config)?;
            Ok(Box::new(GeminiProvider::from_config(api_key, &config.gemini)))
        }
        unknown => Err(ProviderError::UnknownProvider(unknown.to_string())),
    }
}

/// Retrieve the API key. Priority: environment variable > `gemini.api_key`.
///
/// # Errors
///
/// Returns [`ProviderError::MissingApiKey`] when neither source is set.
pub fn resolve_api_key(config: &Config) -> Result<String, ProviderError> {
    if let Ok(key) = std::env::var(API_KEY_ENV)
        && !key.is_empty()
    {
        return Ok(key);
    }

    config
        .gemini
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            ProviderError::MissingApiKey(format!(
                "Set {} environment variable or add gemini.api_key to config.toml",
                API_KEY_ENV
            ))
        })
}
