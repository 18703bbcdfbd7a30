//! Profile scoping
//!
//! Claude Code can run several profiles side by side by pointing
//! `CLAUDE_CONFIG_DIR` at different directories. Each profile keeps its own
//! Keychain entry, so everything keyed per profile (secret-store service name,
//! usage cache file) is suffixed with a short fingerprint of the override.
//!
//! The derivation is pure: the same override always yields the same
//! fingerprint, and an unset (or empty) override uses the fixed defaults.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable Claude Code reads for its config directory override
pub const CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

/// Secret-store service name Claude Code stores its OAuth credentials under
pub const KEYCHAIN_SERVICE_BASE: &str = "Claude Code-credentials";

/// Base name of the usage cache file in the temp directory
pub const CACHE_FILE_BASE: &str = "claudeline-usage";

/// Credentials file name inside the config directory
pub const CREDENTIALS_FILE_NAME: &str = ".credentials.json";

/// Number of hash bytes kept in a fingerprint (8 hex chars)
const FINGERPRINT_BYTES: usize = 4;

/// Short hex fingerprint of a config directory override.
///
/// Lowercase hex of the first four bytes of the SHA-256 digest, matching the
/// suffix Claude Code appends to its Keychain service name.
pub fn fingerprint(config_dir: &str) -> String {
    let digest = Sha256::digest(config_dir.as_bytes());
    digest[..FINGERPRINT_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

// ============================================================================
// Profile
// ============================================================================

/// A credential/config scope selected by an optional directory override
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    config_dir: Option<String>,
}

impl Profile {
    /// Create a profile from an optional override. Empty strings count as unset.
    pub fn new(config_dir: Option<String>) -> Self {
        Self {
            config_dir: config_dir.filter(|dir| !dir.is_empty()),
        }
    }

    /// Read the override from `CLAUDE_CONFIG_DIR`
    pub fn from_env() -> Self {
        Self::new(std::env::var(CONFIG_DIR_ENV).ok())
    }

    /// The raw override string, if any
    pub fn config_dir_override(&self) -> Option<&str> {
        self.config_dir.as_deref()
    }

    /// Fingerprint of the override, `None` for the default profile
    pub fn fingerprint(&self) -> Option<String> {
        self.config_dir.as_deref().map(fingerprint)
    }

    /// Secret-store service name for this profile
    pub fn keychain_service_name(&self) -> String {
        match self.fingerprint() {
            Some(fp) => format!("{}-{}", KEYCHAIN_SERVICE_BASE, fp),
            None => KEYCHAIN_SERVICE_BASE.to_string(),
        }
    }

    /// Usage cache file in the system temp directory
    pub fn cache_file_path(&self) -> PathBuf {
        self.cache_file_path_in(&std::env::temp_dir())
    }

    /// Usage cache file inside `dir`
    pub fn cache_file_path_in(&self, dir: &Path) -> PathBuf {
        let name = match self.fingerprint() {
            Some(fp) => format!("{}-{}.json", CACHE_FILE_BASE, fp),
            None => format!("{}.json", CACHE_FILE_BASE),
        };
        dir.join(name)
    }

    /// Claude Code config directory: the override, else `~/.claude`.
    ///
    /// Returns `None` only when no override is set and the home directory
    /// cannot be determined.
    pub fn config_dir(&self) -> Option<PathBuf> {
        match &self.config_dir {
            Some(dir) => Some(PathBuf::from(dir)),
            None => dirs::home_dir().map(|home| home.join(".claude")),
        }
    }

    /// Path of the flat-file credentials fallback
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.config_dir().map(|dir| dir.join(CREDENTIALS_FILE_NAME))
    }
}

// ============================================================================
// Tests
// ============================================================================
