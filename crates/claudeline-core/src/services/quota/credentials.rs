//! Credential resolution
//!
//! Resolves the Claude Code OAuth credentials for a profile. Sources are tried
//! in order:
//!
//! 1. **Platform secret store** (when the platform has one):
//!    - **macOS**: Keychain, via `/usr/bin/security find-generic-password`
//!    - **Windows**: Credential Manager
//! 2. **File fallback**: `<config-dir>/.credentials.json`
//!
//! A source that cannot be queried or has nothing stored is a soft miss and
//! the next source is tried. A source that returns a payload which does not
//! parse stops the search with `CredentialCorrupt`.
//!
//! Token refresh is out of scope: an expired token is returned as-is and the
//! usage API rejects it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::provider::QuotaError;
use super::types::Credentials;
use crate::profile::Profile;
use crate::utils::{command_stdout, create_command};

/// Path of the macOS Keychain command line tool
const SECURITY_BIN: &str = "/usr/bin/security";

// ============================================================================
// Credentials File Types
// ============================================================================

/// Claude credentials payload (Keychain item or `.credentials.json`)
///
/// The payload nests the OAuth credentials under `claudeAiOauth`.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "claudeAiOauth")]
    claude_ai_oauth: Option<ClaudeOAuthCredentials>,
}

/// OAuth credentials stored within the claudeAiOauth object
#[derive(Debug, Deserialize)]
struct ClaudeOAuthCredentials {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,

    /// Expiration time in milliseconds since epoch
    #[serde(rename = "expiresAt")]
    expires_at: Option<i64>,

    #[serde(rename = "subscriptionType")]
    subscription_type: Option<String>,
}

/// Parse a credentials payload.
///
/// A payload without `claudeAiOauth` (or without a token) parses to empty
/// credentials; only malformed JSON is an error.
fn parse_credentials(content: &str) -> Result<Credentials, serde_json::Error> {
    let file: CredentialsFile = serde_json::from_str(content)?;
    let Some(oauth) = file.claude_ai_oauth else {
        return Ok(Credentials::default());
    };

    Ok(Credentials {
        access_token: oauth.access_token.unwrap_or_default(),
        subscription_type: oauth.subscription_type.unwrap_or_default(),
        expires_at: oauth.expires_at.and_then(DateTime::<Utc>::from_timestamp_millis),
    })
}

// ============================================================================
// Secret Store Capability
// ============================================================================

/// Native secret store available on this platform
///
/// Resolved once when the store is built, so the lookup order is plain data
/// rather than conditionals spread through the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStore {
    /// macOS Keychain
    MacKeychain,
    /// Windows Credential Manager
    WindowsCredentialManager,
    /// No native store; only the file fallback is used
    Unavailable,
}

impl SecretStore {
    /// Detect the secret store for the current platform
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            SecretStore::MacKeychain
        } else if cfg!(target_os = "windows") {
            SecretStore::WindowsCredentialManager
        } else {
            SecretStore::Unavailable
        }
    }

    /// Lookup strategy for this store, keyed by the given service name
    fn source(self, service: String) -> Option<CredentialSource> {
        match self {
            SecretStore::MacKeychain => Some(CredentialSource::Keychain { service }),
            SecretStore::WindowsCredentialManager => {
                Some(CredentialSource::CredentialManager { service })
            }
            SecretStore::Unavailable => None,
        }
    }
}

// ============================================================================
// Credential Sources
// ============================================================================

/// One place credentials may be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// macOS Keychain generic password
    Keychain { service: String },
    /// Windows Credential Manager entry (account = current user)
    CredentialManager { service: String },
    /// Flat JSON file
    File(PathBuf),
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Keychain { service } => write!(f, "keychain \"{}\"", service),
            CredentialSource::CredentialManager { service } => {
                write!(f, "credential manager \"{}\"", service)
            }
            CredentialSource::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

impl CredentialSource {
    /// Load the raw payload, or `None` when this source has nothing for us
    pub fn load(&self) -> Option<String> {
        let payload = match self {
            CredentialSource::Keychain { service } => load_from_keychain(service),
            CredentialSource::CredentialManager { service } => {
                load_from_credential_manager(service)
            }
            CredentialSource::File(path) => match std::fs::read_to_string(path) {
                Ok(content) => Some(content),
                Err(e) => {
                    log::debug!("[quota:credentials] Cannot read {}: {}", path.display(), e);
                    None
                }
            },
        }?;

        if payload.trim().is_empty() {
            log::debug!("[quota:credentials] Empty payload from {}", self);
            return None;
        }
        Some(payload)
    }
}

/// Query the Keychain through the `security` tool
fn load_from_keychain(service: &str) -> Option<String> {
    log::debug!("[quota:credentials] Querying Keychain service \"{}\"", service);

    let payload = command_stdout(
        create_command(SECURITY_BIN).args(["find-generic-password", "-s", service, "-w"]),
    );
    if payload.is_none() {
        log::debug!("[quota:credentials] Keychain lookup failed, trying next source");
    }
    payload
}

/// Query the Windows Credential Manager
#[cfg(target_os = "windows")]
fn load_from_credential_manager(service: &str) -> Option<String> {
    use keyring::Entry;

    log::debug!("[quota:credentials] Querying Credential Manager \"{}\"", service);

    let username = std::env::var("USERNAME").unwrap_or_else(|_| "default".to_string());
    let entry = Entry::new(service, &username)
        .map_err(|e| log::debug!("[quota:credentials] Keyring entry failed: {}", e))
        .ok()?;

    entry
        .get_password()
        .map_err(|e| log::debug!("[quota:credentials] Credential Manager lookup failed: {}", e))
        .ok()
}

#[cfg(not(target_os = "windows"))]
fn load_from_credential_manager(service: &str) -> Option<String> {
    log::debug!(
        "[quota:credentials] Credential Manager unavailable on this platform (\"{}\")",
        service
    );
    None
}

// ============================================================================
// CredentialStore
// ============================================================================

/// Ordered credential lookup for one profile
#[derive(Debug, Clone)]
pub struct CredentialStore {
    sources: Vec<CredentialSource>,
}

impl CredentialStore {
    /// Build the lookup order for a profile using the detected secret store
    pub fn new(profile: &Profile) -> Self {
        Self::with_secret_store(profile, SecretStore::detect())
    }

    /// Build the lookup order for a profile with an explicit secret store
    pub fn with_secret_store(profile: &Profile, store: SecretStore) -> Self {
        let mut sources = Vec::with_capacity(2);
        if let Some(source) = store.source(profile.keychain_service_name()) {
            sources.push(source);
        }
        if let Some(path) = profile.credentials_path() {
            sources.push(CredentialSource::File(path));
        }
        Self::with_sources(sources)
    }

    /// Use an explicit list of sources, tried in order
    pub fn with_sources(sources: Vec<CredentialSource>) -> Self {
        Self { sources }
    }

    /// The sources in lookup order
    pub fn sources(&self) -> &[CredentialSource] {
        &self.sources
    }

    /// Resolve credentials from the first source that has a payload
    ///
    /// # Errors
    ///
    /// - `CredentialCorrupt` if the first payload found does not parse
    /// - `CredentialUnavailable` if no source has a payload
    pub fn resolve(&self) -> Result<Credentials, QuotaError> {
        for source in &self.sources {
            let Some(payload) = source.load() else {
                continue;
            };

            return match parse_credentials(&payload) {
                Ok(creds) => {
                    log::debug!("[quota:credentials] Loaded credentials from {}", source);
                    Ok(creds)
                }
                Err(e) => {
                    log::warn!("[quota:credentials] Failed to parse {}: {}", source, e);
                    Err(QuotaError::CredentialCorrupt(format!("{}: {}", source, e)))
                }
            };
        }

        Err(QuotaError::CredentialUnavailable(format!(
            "no credentials in {} source(s)",
            self.sources.len()
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = r#"{
        "claudeAiOauth": {
            "accessToken": "sk-ant-oat01-test",
            "refreshToken": "sk-ant-ort01-test",
            "expiresAt": 1705320000000,
            "scopes": ["user:inference"],
            "subscriptionType": "max"
        }
    }"#;

    fn write_creds(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_credentials() {
        let creds = parse_credentials(VALID).unwrap();
        assert_eq!(creds.access_token, "sk-ant-oat01-test");
        assert_eq!(creds.subscription_type, "max");
        assert_eq!(
            creds.expires_at.map(|at| at.timestamp_millis()),
            Some(1705320000000)
        );
    }

    #[test]
    fn test_parse_credentials_missing_oauth_object() {
        assert_eq!(parse_credentials("{}").unwrap(), Credentials::default());
    }

    #[test]
    fn test_parse_credentials_missing_token() {
        let creds = parse_credentials(r#"{"claudeAiOauth": {"subscriptionType": "pro"}}"#).unwrap();
        assert!(!creds.has_token());
        assert_eq!(creds.subscription_type, "pro");
    }

    #[test]
    fn test_resolve_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_creds(&dir, ".credentials.json", VALID);

        let store = CredentialStore::with_sources(vec![CredentialSource::File(path)]);
        let creds = store.resolve().unwrap();
        assert_eq!(creds.access_token, "sk-ant-oat01-test");
    }

    #[test]
    fn test_resolve_falls_through_soft_misses() {
        let dir = TempDir::new().unwrap();
        let path = write_creds(&dir, "second.json", VALID);

        let store = CredentialStore::with_sources(vec![
            CredentialSource::Keychain {
                service: "claudeline-test-no-such-service".to_string(),
            },
            CredentialSource::CredentialManager {
                service: "claudeline-test-no-such-service".to_string(),
            },
            CredentialSource::File(dir.path().join("missing.json")),
            CredentialSource::File(path),
        ]);

        assert_eq!(store.resolve().unwrap().access_token, "sk-ant-oat01-test");
    }

    #[test]
    fn test_resolve_first_source_wins() {
        let dir = TempDir::new().unwrap();
        let first = write_creds(
            &dir,
            "first.json",
            r#"{"claudeAiOauth": {"accessToken": "first", "subscriptionType": "pro"}}"#,
        );
        let second = write_creds(&dir, "second.json", VALID);

        let store = CredentialStore::with_sources(vec![
            CredentialSource::File(first),
            CredentialSource::File(second),
        ]);
        assert_eq!(store.resolve().unwrap().access_token, "first");
    }

    #[test]
    fn test_resolve_corrupt_payload_is_error() {
        let dir = TempDir::new().unwrap();
        let corrupt = write_creds(&dir, "corrupt.json", "{\"claudeAiOauth\": ");
        let valid = write_creds(&dir, "valid.json", VALID);

        let store = CredentialStore::with_sources(vec![
            CredentialSource::File(corrupt),
            CredentialSource::File(valid),
        ]);
        assert!(matches!(
            store.resolve(),
            Err(QuotaError::CredentialCorrupt(_))
        ));
    }

    #[test]
    fn test_resolve_nothing_found() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::with_sources(vec![CredentialSource::File(
            dir.path().join("nope.json"),
        )]);
        assert!(matches!(
            store.resolve(),
            Err(QuotaError::CredentialUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_file_is_soft_miss() {
        let dir = TempDir::new().unwrap();
        let empty = write_creds(&dir, "empty.json", "  \n");
        let store = CredentialStore::with_sources(vec![CredentialSource::File(empty)]);
        assert!(matches!(
            store.resolve(),
            Err(QuotaError::CredentialUnavailable(_))
        ));
    }

    #[test]
    fn test_store_order_for_profile() {
        let profile = Profile::new(Some("/Users/oa/.claude-work".to_string()));

        let store = CredentialStore::with_secret_store(&profile, SecretStore::MacKeychain);
        assert_eq!(
            store.sources(),
            &[
                CredentialSource::Keychain {
                    service: "Claude Code-credentials-1ef5702c".to_string()
                },
                CredentialSource::File(
                    PathBuf::from("/Users/oa/.claude-work").join(".credentials.json")
                ),
            ]
        );

        let store = CredentialStore::with_secret_store(&profile, SecretStore::Unavailable);
        assert_eq!(store.sources().len(), 1);
        assert!(matches!(store.sources()[0], CredentialSource::File(_)));
    }

    #[test]
    fn test_detect_matches_platform() {
        let store = SecretStore::detect();
        if cfg!(target_os = "macos") {
            assert_eq!(store, SecretStore::MacKeychain);
        } else if cfg!(target_os = "windows") {
            assert_eq!(store, SecretStore::WindowsCredentialManager);
        } else {
            assert_eq!(store, SecretStore::Unavailable);
        }
    }
}
