//! Quota tracking types
//!
//! Types shared by the credential, cache and fetch layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Credentials
// ============================================================================

/// OAuth credentials resolved for the current profile
///
/// Empty strings are a valid state: no token (or an unknown plan) simply means
/// the usage segments are omitted from the status line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// OAuth access token
    pub access_token: String,
    /// Subscription type as stored by Claude Code (e.g. "max", "pro")
    pub subscription_type: String,
    /// Token expiry, when the store records one
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Whether an access token is present
    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Subscription plan, if the type is one the usage API reports on
    pub fn plan(&self) -> Option<Plan> {
        Plan::from_subscription_type(&self.subscription_type)
    }

    /// Whether the recorded expiry lies before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Claude subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plan {
    Max,
    Pro,
    Team,
}

impl Plan {
    /// Map a subscription type string to a plan.
    ///
    /// Matching is a case-insensitive substring check, tried in the order
    /// max, pro, team.
    pub fn from_subscription_type(subscription_type: &str) -> Option<Self> {
        let lower = subscription_type.to_lowercase();
        if lower.contains("max") {
            Some(Plan::Max)
        } else if lower.contains("pro") {
            Some(Plan::Pro)
        } else if lower.contains("team") {
            Some(Plan::Team)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Max => write!(f, "Max"),
            Plan::Pro => write!(f, "Pro"),
            Plan::Team => write!(f, "Team"),
        }
    }
}

// ============================================================================
// Window Types
// ============================================================================

/// Rolling quota window reported by the usage API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaWindowType {
    /// 5-hour rolling window (rate limit)
    FiveHour,
    /// 7-day rolling window (all models)
    SevenDay,
}

impl QuotaWindowType {
    /// strftime layout used to show the window's reset time
    pub fn reset_format(&self) -> &'static str {
        match self {
            QuotaWindowType::FiveHour => "%H:%M",
            QuotaWindowType::SevenDay => "%a %H:%M",
        }
    }
}

// ============================================================================
// Snapshot Types
// ============================================================================

/// A single usage window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    /// Percentage used; the API reports 28.0 for 28% and may exceed 100
    #[serde(default)]
    pub utilization: f64,
    /// When the window resets
    #[serde(default)]
    pub resets_at: Option<DateTime<Utc>>,
}

impl UsageWindow {
    pub fn new(utilization: f64, resets_at: Option<DateTime<Utc>>) -> Self {
        Self {
            utilization,
            resets_at,
        }
    }

    /// Utilization rounded and clamped for display
    pub fn display_percent(&self) -> u8 {
        display_percent(self.utilization)
    }
}

/// A point-in-time read of both quota windows
///
/// This is also the `data` payload of the cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub five_hour: UsageWindow,
    pub seven_day: UsageWindow,
}

impl QuotaSnapshot {
    pub fn new(five_hour: UsageWindow, seven_day: UsageWindow) -> Self {
        Self {
            five_hour,
            seven_day,
        }
    }

    /// Look up a window by type
    pub fn window(&self, window_type: QuotaWindowType) -> &UsageWindow {
        match window_type {
            QuotaWindowType::FiveHour => &self.five_hour,
            QuotaWindowType::SevenDay => &self.seven_day,
        }
    }
}

/// Round half away from zero and clamp to 0..=100.
///
/// Every percentage on the status line goes through this, so context and quota
/// bars agree on rounding. NaN maps to 0.
pub fn display_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

// ============================================================================
// Alert Level
// ============================================================================

/// Alert level for a usage percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    /// Normal usage, no alert
    Normal,
    /// Usage is approaching the limit
    Warning,
    /// Usage is at or near the limit
    Critical,
}

impl AlertLevel {
    /// Determine alert level based on usage percentage and thresholds
    pub fn from_usage(used_percent: f64, warning_threshold: f64, critical_threshold: f64) -> Self {
        if used_percent >= critical_threshold {
            AlertLevel::Critical
        } else if used_percent >= warning_threshold {
            AlertLevel::Warning
        } else {
            AlertLevel::Normal
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
