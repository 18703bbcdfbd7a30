//! Status line input
//!
//! Claude Code pipes one JSON document to the status line command on every
//! render. Only the fields the line shows are decoded; everything else is
//! ignored.

use std::io::Read;

use anyhow::{Context, Result};
use claudeline_core::services::quota::types::display_percent;
use serde::Deserialize;

/// JSON received from Claude Code on stdin
#[derive(Debug, Default, Deserialize)]
pub struct StatusInput {
    #[serde(default)]
    pub model: ModelInfo,
    #[serde(default)]
    pub context_window: ContextWindow,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContextWindow {
    /// Share of the context window in use; absent before the first response
    pub used_percentage: Option<f64>,
}

impl StatusInput {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("parse stdin JSON")
    }

    /// Context usage for display, 0 when Claude Code did not report one
    pub fn context_percent(&self) -> u8 {
        self.context_window
            .used_percentage
            .map(display_percent)
            .unwrap_or(0)
    }
}

/// Read and decode the whole of stdin
pub fn read_stdin() -> Result<StatusInput> {
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("read stdin")?;
    StatusInput::parse(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_input() {
        let json = br#"{
            "session_id": "abc",
            "model": {"id": "claude-opus-4-1", "display_name": "Opus"},
            "workspace": {"current_dir": "/tmp"},
            "context_window": {"used_percentage": 42.6}
        }"#;

        let input = StatusInput::parse(json).unwrap();
        assert_eq!(input.model.display_name, "Opus");
        assert_eq!(input.context_percent(), 43);
    }

    #[test]
    fn test_missing_context_is_zero() {
        let input = StatusInput::parse(br#"{"model": {"display_name": "Sonnet"}}"#).unwrap();
        assert_eq!(input.context_percent(), 0);

        let input = StatusInput::parse(
            br#"{"model": {"display_name": "Sonnet"}, "context_window": {"used_percentage": null}}"#,
        )
        .unwrap();
        assert_eq!(input.context_percent(), 0);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = StatusInput::parse(b"not json").unwrap_err();
        assert!(err.to_string().contains("parse stdin JSON"));
    }
}
