//! Error types for the AgroMind domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context (store, model provider, upstream data) has its own
//! error type; [`Error`] is the umbrella the HTTP surface maps to statuses.

use thiserror::Error;

/// The top-level error type for all AgroMind operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request-level failures ---
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Feature not configured: {0}")]
    NotConfigured(String),

    // --- Collaborator failures ---
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. a taken username).
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Failures of a third-party data provider (weather, market, soil).
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("{source_name} responded with status {status}")]
    Status { source_name: String, status: u16 },

    #[error("{source_name} request failed: {reason}")]
    Network { source_name: String, reason: String },

    #[error("{source_name} returned a malformed payload: {reason}")]
    Malformed { source_name: String, reason: String },

    #[error("{source_name} returned no data")]
    Empty { source_name: String },
}

impl UpstreamError {
    pub fn malformed(source_name: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn network(source_name: &str, reason: impl std::fmt::Display) -> Self {
        Self::Network {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn upstream_error_names_the_source() {
        let err = Error::from(UpstreamError::Status {
            source_name: "openweather".into(),
            status: 401,
        });
        assert!(err.to_string().contains("openweather"));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn duplicate_store_error_converts() {
        let err: Error = StoreError::Duplicate("username 'ravi'".into()).into();
        assert!(matches!(err, Error::Store(StoreError::Duplicate(_))));
        assert!(err.to_string().contains("ravi"));
    }
}
