//! Language-model provider implementations for AgroMind.
//!
//! All providers implement the `agromind_core::Provider` trait.
//! [`build_from_config`] picks the backend described by `[provider]`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use agromind_core::error::ProviderError;
use agromind_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the configured provider.
///
/// Returns `Ok(None)` when the provider needs an API key and none is set;
/// the query endpoint is then disabled while everything else keeps working.
pub fn build_from_config(
    config: &agromind_config::AppConfig,
) -> Result<Option<Arc<dyn Provider>>, ProviderError> {
    let provider = &config.provider;
    let name = provider.name.as_str();

    let api_key = match (&provider.api_key, is_local(name)) {
        (Some(key), _) => key.clone(),
        (None, true) => name.to_string(),
        (None, false) => {
            info!(provider = %name, "No API key configured; advisory queries disabled");
            return Ok(None);
        }
    };

    let base_url = provider
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(name));

    let built = OpenAiCompatProvider::new(
        name,
        base_url,
        api_key,
        Duration::from_secs(provider.timeout_secs),
    )?;
    Ok(Some(Arc::new(built)))
}

/// Self-hosted servers that accept any key.
fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" => "http://localhost:8080/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}
