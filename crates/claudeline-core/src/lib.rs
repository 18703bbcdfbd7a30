//! # claudeline-core
//!
//! Core logic for the claudeline status line.
//!
//! This crate provides:
//! - Profile scoping for cache files and secret-store keys (`profile` module)
//! - Usage quota acquisition and caching (`services::quota` module)
//! - Process helpers (`utils` module)

pub mod profile;
pub mod services;
pub mod utils;

// Re-export utils for convenience
pub use utils::create_command;

pub use profile::Profile;

// Re-export commonly used types from services
pub use services::quota::{
    AlertLevel, CacheMiss, CacheRecord, ClaudeUsageFetcher, CredentialSource, CredentialStore,
    Credentials, Plan, QuotaCache, QuotaError, QuotaFetcher, QuotaService, QuotaSnapshot,
    QuotaWindowType, SecretStore, UsageWindow,
};
