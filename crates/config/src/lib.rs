//! Configuration loading, validation, and management for AgroMind.
//!
//! Loads configuration from `./agromind.toml` (or an explicit path) with
//! environment variable overrides. Validates all settings at startup.
//!
//! Every upstream credential is optional: a missing key disables only the
//! feature that needs it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILE_NAME: &str = "agromind.toml";

/// The root configuration structure.
///
/// Maps directly to `agromind.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language-model provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// HTTP server
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Persistence
    #[serde(default)]
    pub store: StoreConfig,

    /// Weather, market and soil providers
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Advisory pipeline tuning
    #[serde(default)]
    pub advisory: AdvisoryConfig,

    /// Credential hashing
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

// ── Provider ──────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name; selects the default base URL
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Overrides the provider's well-known base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion length cap per advisory reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    400
}
fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_key: None,
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Request body cap; query images arrive inline as base64
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default = "default_store_url")]
    pub url: String,
}

fn default_store_backend() -> String {
    "sqlite".into()
}
fn default_store_url() -> String {
    "sqlite://agromind.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
        }
    }
}

// ── Sources ───────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Timeout applied to every upstream HTTP call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openweather_api_key: Option<String>,

    #[serde(default = "default_openweather_url")]
    pub openweather_url: String,

    /// data.gov.in key for the mandi price resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_api_key: Option<String>,

    #[serde(default = "default_market_url")]
    pub market_url: String,

    #[serde(default = "default_market_record_limit")]
    pub market_record_limit: u32,

    /// "soilgrids" or "bhuvan"
    #[serde(default = "default_soil_provider")]
    pub soil_provider: String,

    #[serde(default = "default_soilgrids_url")]
    pub soilgrids_url: String,

    #[serde(default = "default_bhuvan_url")]
    pub bhuvan_url: String,
}

fn default_request_timeout() -> u64 {
    30
}
fn default_openweather_url() -> String {
    "https://api.openweathermap.org/data/2.5".into()
}
fn default_market_url() -> String {
    "https://api.data.gov.in/resource/9ef84268-d588-465a-a308-a864a43d0070".into()
}
fn default_market_record_limit() -> u32 {
    50
}
fn default_soil_provider() -> String {
    "soilgrids".into()
}
fn default_soilgrids_url() -> String {
    "https://rest.isric.org/soilgrids/v2.0".into()
}
fn default_bhuvan_url() -> String {
    "https://bhuvan-wps.nrsc.gov.in/bhuvan/wps".into()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            openweather_api_key: None,
            openweather_url: default_openweather_url(),
            market_api_key: None,
            market_url: default_market_url(),
            market_record_limit: default_market_record_limit(),
            soil_provider: default_soil_provider(),
            soilgrids_url: default_soilgrids_url(),
            bhuvan_url: default_bhuvan_url(),
        }
    }
}

impl std::fmt::Debug for SourcesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcesConfig")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("openweather_api_key", &redact(&self.openweather_api_key))
            .field("openweather_url", &self.openweather_url)
            .field("market_api_key", &redact(&self.market_api_key))
            .field("market_url", &self.market_url)
            .field("market_record_limit", &self.market_record_limit)
            .field("soil_provider", &self.soil_provider)
            .field("soilgrids_url", &self.soilgrids_url)
            .field("bhuvan_url", &self.bhuvan_url)
            .finish()
    }
}

// ── Advisory ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// Stored turns replayed to the model on each query
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Stored turns kept per farmer (0 = keep everything)
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,
}

fn default_history_window() -> usize {
    4
}
fn default_history_retention() -> usize {
    200
}

impl AdvisoryConfig {
    /// Retention as the store expects it.
    pub fn retention(&self) -> Option<usize> {
        (self.history_retention > 0).then_some(self.history_retention)
    }
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            history_retention: default_history_retention(),
        }
    }
}

// ── Auth ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_bcrypt_cost() -> u32 {
    10
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (or `./agromind.toml`), then apply
    /// environment overrides:
    ///
    /// - `DATABASE_URL`
    /// - `AGROMIND_API_KEY` (highest priority), `OPENAI_API_KEY`
    /// - `AGROMIND_MODEL`
    /// - `OPENWEATHER_API_KEY`
    /// - `DATA_GOV_API_KEY`
    /// - `PORT`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// `./agromind.toml`
    pub fn default_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.url = url;
        }

        if let Some(key) = lookup("AGROMIND_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.provider.api_key = Some(key);
        }

        if let Some(model) = lookup("AGROMIND_MODEL") {
            self.provider.model = model;
        }

        if let Some(key) = lookup("OPENWEATHER_API_KEY") {
            self.sources.openweather_api_key = Some(key);
        }

        if let Some(key) = lookup("DATA_GOV_API_KEY") {
            self.sources.market_api_key = Some(key);
        }

        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring non-numeric PORT"),
            }
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.provider.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "provider.max_tokens must be > 0".into(),
            ));
        }

        if self.advisory.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "advisory.history_window must be > 0".into(),
            ));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::ValidationError(
                "auth.bcrypt_cost must be between 4 and 31".into(),
            ));
        }

        match self.store.backend.as_str() {
            "sqlite" | "memory" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "store.backend '{other}' is not one of: sqlite, memory"
                )));
            }
        }

        match self.sources.soil_provider.as_str() {
            "soilgrids" | "bhuvan" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "sources.soil_provider '{other}' is not one of: soilgrids, bhuvan"
                )));
            }
        }

        Ok(())
    }

    /// Whether the language-model provider has credentials.
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.provider.max_tokens, 400);
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.advisory.history_window, 4);
        assert!(!config.has_api_key());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.name, config.provider.name);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.sources.soil_provider, "soilgrids");
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_soil_provider_rejected() {
        let mut config = AppConfig::default();
        config.sources.soil_provider = "nasa".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("nasa"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/agromind.toml")).unwrap();
        assert_eq!(config.store.backend, "sqlite");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agromind.toml");
        std::fs::write(
            &path,
            r#"
[provider]
model = "gpt-4o-mini"

[advisory]
history_retention = 0
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.max_tokens, 400);
        assert_eq!(config.advisory.retention(), None);
        assert_eq!(config.advisory.history_window, 4);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-openai"),
            ("AGROMIND_API_KEY", "sk-agromind"),
            ("OPENWEATHER_API_KEY", "ow-key"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("PORT", "8081"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.provider.api_key.as_deref(), Some("sk-agromind"));
        assert_eq!(config.sources.openweather_api_key.as_deref(), Some("ow-key"));
        assert!(config.sources.market_api_key.is_none());
        assert_eq!(config.store.url, "sqlite::memory:");
        assert_eq!(config.gateway.port, 8081);
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-very-secret".into());
        config.sources.market_api_key = Some("gov-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("gov-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o"));
        assert!(toml_str.contains("3000"));
    }
}
