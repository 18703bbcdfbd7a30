//! Claude usage fetcher
//!
//! Implements the QuotaFetcher trait against Anthropic's OAuth usage API.
//!
//! # Overview
//!
//! One bearer-authenticated GET to the usage endpoint with the OAuth beta
//! header, bounded by a 5 second timeout. The body carries the two rolling
//! windows the status line shows:
//!
//! - **five_hour**: rolling rate-limit window
//! - **seven_day**: weekly usage (all models)
//!
//! Other windows in the body (`seven_day_opus`, `extra_usage`, ...) are
//! ignored. A null or absent window reads as 0% with no reset time, and an
//! empty or unparsable `resets_at` only hides the reset time.
//!
//! # Token Expiration
//!
//! Anthropic's OAuth does NOT support automatic token refresh here. An expired
//! token comes back as HTTP 401 and is reported like any other failed fetch.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::provider::{QuotaError, QuotaFetcher};
use super::types::{QuotaSnapshot, UsageWindow};

// ============================================================================
// Constants
// ============================================================================

/// Anthropic OAuth usage API endpoint
pub const USAGE_API_URL: &str = "https://api.anthropic.com/api/oauth/usage";

/// OAuth beta header value for API access
const OAUTH_BETA_HEADER: &str = "oauth-2025-04-20";

/// HTTP request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest body excerpt written to the debug log
const LOG_BODY_LIMIT: usize = 200;

// ============================================================================
// API Response Types
// ============================================================================

/// Response from Anthropic's OAuth usage API
#[derive(Debug, Deserialize)]
struct UsageResponse {
    /// 5-hour rolling window usage
    #[serde(default)]
    five_hour: Option<ApiWindow>,

    /// 7-day rolling window usage (all models)
    #[serde(default)]
    seven_day: Option<ApiWindow>,
}

/// A single usage window from the API
#[derive(Debug, Deserialize)]
struct ApiWindow {
    /// Percentage used (28.0 for 28%)
    #[serde(default)]
    utilization: Option<f64>,

    /// When this window resets (RFC 3339)
    #[serde(default)]
    resets_at: Option<String>,
}

impl UsageResponse {
    fn into_snapshot(self) -> QuotaSnapshot {
        QuotaSnapshot::new(
            ApiWindow::into_window(self.five_hour),
            ApiWindow::into_window(self.seven_day),
        )
    }
}

impl ApiWindow {
    fn into_window(window: Option<Self>) -> UsageWindow {
        match window {
            Some(window) => UsageWindow::new(
                window.utilization.unwrap_or_default(),
                window.resets_at.as_deref().and_then(parse_reset),
            ),
            None => UsageWindow::new(0.0, None),
        }
    }
}

fn parse_reset(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(e) => {
            log::debug!("[quota:fetch] Failed to parse resets_at {:?}: {}", raw, e);
            None
        }
    }
}

/// Decode a usage API body
fn parse_usage(body: &str) -> Result<QuotaSnapshot, QuotaError> {
    let response: UsageResponse = serde_json::from_str(body)
        .inspect_err(|e| log::warn!("[quota:fetch] Failed to decode usage response: {}", e))?;
    Ok(response.into_snapshot())
}

// ============================================================================
// ClaudeUsageFetcher
// ============================================================================

/// Fetches usage windows from Anthropic's OAuth usage API
pub struct ClaudeUsageFetcher {
    /// HTTP client for API requests
    client: Client,

    /// Usage endpoint URL
    endpoint: String,
}

impl ClaudeUsageFetcher {
    /// Create a fetcher for the production endpoint
    pub fn new() -> Self {
        Self::with_endpoint(USAGE_API_URL)
    }

    /// Create a fetcher for a custom endpoint
    ///
    /// Useful for testing against a local server.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("claudeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for ClaudeUsageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuotaFetcher for ClaudeUsageFetcher {
    async fn fetch(&self, token: &str) -> Result<QuotaSnapshot, QuotaError> {
        log::debug!("[quota:fetch] GET {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .header("anthropic-beta", OAUTH_BETA_HEADER)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            log::warn!("[quota:fetch] Usage API returned HTTP {}", status);
            return Err(QuotaError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        log::debug!(
            "[quota:fetch] Response body: {}",
            body.chars().take(LOG_BODY_LIMIT).collect::<String>()
        );

        parse_usage(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================
