//! Quota fetcher trait and error types
//!
//! Defines the interface the quota service fetches through.

use async_trait::async_trait;
use thiserror::Error;

use super::types::QuotaSnapshot;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while acquiring quota information
///
/// None of these are fatal to a render: the caller logs them and omits the
/// usage segments.
#[derive(Error, Debug)]
pub enum QuotaError {
    /// No credential source yielded a payload
    #[error("Credentials unavailable: {0}")]
    CredentialUnavailable(String),

    /// A credential source was found but its payload could not be parsed
    #[error("Credentials corrupt: {0}")]
    CredentialCorrupt(String),

    /// Network request failed or timed out
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The usage API answered with a non-200 status
    #[error("Unexpected status {0}")]
    HttpStatus(u16),

    /// Failed to decode the API response
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for QuotaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QuotaError::NetworkError("Request timed out".to_string())
        } else if err.is_connect() {
            QuotaError::NetworkError("Connection failed".to_string())
        } else if err.is_decode() {
            QuotaError::ParseError(err.to_string())
        } else if let Some(status) = err.status() {
            QuotaError::HttpStatus(status.as_u16())
        } else {
            QuotaError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for QuotaError {
    fn from(err: serde_json::Error) -> Self {
        QuotaError::ParseError(err.to_string())
    }
}

// ============================================================================
// Fetcher Trait
// ============================================================================

/// Source of remote quota data
///
/// One call is one attempt: implementations must not retry internally. Retry
/// pacing comes from the cache's short failure TTL.
#[async_trait]
pub trait QuotaFetcher: Send + Sync {
    /// Fetch the current usage windows with the given OAuth access token
    ///
    /// # Errors
    ///
    /// - `NetworkError` if the request could not be completed
    /// - `HttpStatus` for any non-200 response
    /// - `ParseError` if the body does not decode
    async fn fetch(&self, token: &str) -> Result<QuotaSnapshot, QuotaError>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let quota_err: QuotaError = json_err.into();
        assert!(matches!(quota_err, QuotaError::ParseError(_)));
    }

    #[test]
    fn test_quota_error_display() {
        assert_eq!(QuotaError::HttpStatus(429).to_string(), "Unexpected status 429");
        assert_eq!(
            QuotaError::CredentialUnavailable("no source".to_string()).to_string(),
            "Credentials unavailable: no source"
        );
    }
}
