//! Usage quota module
//!
//! Acquires the Claude subscription usage windows (5-hour and 7-day) for the
//! status line, keeping the request rate bounded when the host terminal
//! re-spawns the process on every render.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ QuotaService                                            │
//! │   - get_quota(token) -> Option<QuotaSnapshot>           │
//! └─────────────────────────────────────────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌──────────────────────┐  ┌──────────────────────────────┐
//! │ QuotaCache           │  │ trait QuotaFetcher           │
//! │   - read()  (60s/15s)│  │   - fetch(token)             │
//! │   - write()          │  └──────────────────────────────┘
//! └──────────────────────┘             │
//!                                      ▼
//!                            ┌──────────────────┐
//!                            │ClaudeUsageFetcher│
//!                            │  (OAuth usage)   │
//!                            └──────────────────┘
//! ```
//!
//! `CredentialStore` sits beside the service: the caller resolves the access
//! token (Keychain / Credential Manager, then `.credentials.json`) and hands
//! it to `QuotaService::get_quota`.
//!
//! # Usage
//!
//! ```ignore
//! use claudeline_core::{ClaudeUsageFetcher, CredentialStore, Profile, QuotaCache, QuotaService};
//!
//! let profile = Profile::from_env();
//! let creds = CredentialStore::new(&profile).resolve()?;
//! let service = QuotaService::new(QuotaCache::for_profile(&profile), ClaudeUsageFetcher::new());
//! if let Some(snapshot) = service.get_quota(&creds.access_token).await {
//!     println!("5h: {:.0}%", snapshot.five_hour.utilization);
//! }
//! ```

pub mod cache;
pub mod claude;
pub mod credentials;
pub mod provider;
pub mod service;
pub mod types;

// Re-export main types
pub use types::{AlertLevel, Credentials, Plan, QuotaSnapshot, QuotaWindowType, UsageWindow};

// Re-export fetcher trait and error
pub use provider::{QuotaError, QuotaFetcher};

// Re-export components
pub use cache::{CacheMiss, CacheRecord, QuotaCache, FAILURE_TTL, SUCCESS_TTL};
pub use claude::ClaudeUsageFetcher;
pub use credentials::{CredentialSource, CredentialStore, SecretStore};
pub use service::QuotaService;
