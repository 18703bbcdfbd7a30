//! Status line rendering
//!
//! Builds the single output line from segments:
//!
//! ```text
//! [Opus | Max] │ main │ █░░░░ 24% │ ██░░░ 41% (17:00) │ █░░░░ 22% (Thu 09:00)
//!   identity    branch   context      5-hour quota         7-day quota
//! ```
//!
//! Percentages arrive already rounded (half away from zero) and clamped to
//! 0..=100; colors follow `AlertLevel` thresholds per bar kind.

use chrono::{DateTime, Local, TimeZone, Utc};
use colored::{ColoredString, Colorize};

use claudeline_core::{AlertLevel, Plan, QuotaWindowType, UsageWindow};

// ============================================================================
// Constants
// ============================================================================

/// Number of cells in a bar
pub const BAR_WIDTH: usize = 5;

/// ANSI reset prepended to the line to clear state left by earlier renders
const ANSI_RESET: &str = "\x1b[0m";

/// Default auto-compaction threshold (percent of context)
pub const DEFAULT_AUTOCOMPACT_PCT: u8 = 85;

/// The context bar turns critical this many points before auto-compaction
const AUTOCOMPACT_MARGIN: u8 = 5;

/// Context bar warning threshold
const CONTEXT_WARNING_PCT: f64 = 70.0;

/// Quota bar thresholds
const QUOTA_WARNING_PCT: f64 = 75.0;
const QUOTA_CRITICAL_PCT: f64 = 90.0;

/// Max display length for the branch name
pub const BRANCH_MAX_LEN: usize = 30;

// ============================================================================
// Bars
// ============================================================================

/// Which palette and thresholds a bar uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    /// Context window fill; critical at the given percentage
    Context { critical_pct: u8 },
    /// Subscription quota window
    Quota,
}

impl BarKind {
    fn level(&self, pct: u8) -> AlertLevel {
        match self {
            BarKind::Context { critical_pct } => {
                AlertLevel::from_usage(pct as f64, CONTEXT_WARNING_PCT, *critical_pct as f64)
            }
            BarKind::Quota => {
                AlertLevel::from_usage(pct as f64, QUOTA_WARNING_PCT, QUOTA_CRITICAL_PCT)
            }
        }
    }

    fn paint(&self, pct: u8, text: String) -> ColoredString {
        match (self, self.level(pct)) {
            (_, AlertLevel::Critical) => text.red(),
            (BarKind::Context { .. }, AlertLevel::Warning) => text.yellow(),
            (BarKind::Context { .. }, AlertLevel::Normal) => text.green(),
            (BarKind::Quota, AlertLevel::Warning) => text.bright_magenta(),
            (BarKind::Quota, AlertLevel::Normal) => text.bright_blue(),
        }
    }
}

/// Render a bar such as `██░░░ 42%`
pub fn bar(pct: u8, kind: BarKind) -> String {
    let pct = pct.min(100);
    let filled = pct as usize * BAR_WIDTH / 100;
    let empty = BAR_WIDTH - filled;

    format!(
        "{}{} {}%",
        kind.paint(pct, "█".repeat(filled)),
        "░".repeat(empty).dimmed(),
        pct
    )
}

/// Percentage at which the context bar turns critical.
///
/// `CLAUDE_AUTOCOMPACT_PCT_OVERRIDE` moves the compaction point; values that
/// are not an integer in 1..=100 are ignored.
pub fn context_critical_pct(autocompact_override: Option<&str>) -> u8 {
    let compact = autocompact_override
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|v| (1..=100).contains(v))
        .unwrap_or(DEFAULT_AUTOCOMPACT_PCT);
    compact.saturating_sub(AUTOCOMPACT_MARGIN)
}

/// Context bar, with a warning sign once compaction is near
pub fn context_segment(pct: u8, critical_pct: u8) -> String {
    let mut segment = bar(pct, BarKind::Context { critical_pct });
    if pct >= critical_pct {
        segment.push(' ');
        segment.push_str(&"⚠".yellow().to_string());
    }
    segment
}

/// Quota bar followed by the local reset time, e.g. `██░░░ 41% (17:00)`
pub fn usage_segment(window: &UsageWindow, window_type: QuotaWindowType) -> String {
    usage_segment_in(window, window_type, &Local)
}

/// `usage_segment` with an explicit display timezone
pub fn usage_segment_in<Tz>(window: &UsageWindow, window_type: QuotaWindowType, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut segment = bar(window.display_percent(), BarKind::Quota);
    if let Some(resets_at) = window.resets_at {
        segment.push_str(&format!(
            " ({})",
            format_reset(resets_at, tz, window_type.reset_format())
        ));
    }
    segment
}

fn format_reset<Tz>(at: DateTime<Utc>, tz: &Tz, layout: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format(layout).to_string()
}

// ============================================================================
// Text segments
// ============================================================================

/// `[Model | Plan]`, `[Model]` without a plan, nothing without a model
pub fn identity(model: &str, plan: Option<Plan>) -> Option<String> {
    if model.is_empty() {
        return None;
    }
    let text = match plan {
        Some(plan) => format!("[{} | {}]", model, plan),
        None => format!("[{}]", model),
    };
    Some(text.cyan().to_string())
}

pub fn branch_segment(branch: &str) -> String {
    compact_name(branch, BRANCH_MAX_LEN).dimmed().to_string()
}

pub fn tag_segment(tag: &str, max_len: usize) -> String {
    compact_name(tag, max_len).yellow().to_string()
}

/// Shorten `name` to at most `max_len` chars by eliding the middle with `…`
pub fn compact_name(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        return name.to_string();
    }
    if max_len == 0 {
        return String::new();
    }

    let head = (max_len - 1) / 2;
    let tail = max_len - 1 - head;
    let mut out: String = chars[..head].iter().collect();
    out.push('…');
    out.extend(&chars[chars.len() - tail..]);
    out
}

// ============================================================================
// Line
// ============================================================================

/// Ordered segments of one status line
#[derive(Debug, Default)]
pub struct StatusLine {
    segments: Vec<String>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        let segment = segment.into();
        if !segment.is_empty() {
            self.segments.push(segment);
        }
    }

    /// Final line: leading reset, dim separators, non-breaking spaces so the
    /// terminal does not collapse whitespace
    pub fn render(&self) -> String {
        let sep = " │ ".dimmed().to_string();
        let line = self.segments.join(&sep);
        format!("{}{}", ANSI_RESET, line.replace(' ', "\u{a0}"))
    }
}

// ============================================================================
// Tests
// ============================================================================
