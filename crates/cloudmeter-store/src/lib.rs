//! Durable key-value storage for cloudmeter.
//!
//! The only cross-run state the collector keeps is the upstream session
//! token, cached so runs within the token's TTL skip the login exchange.
//! This crate provides that cache behind the [`TokenCache`] trait, with a
//! `RocksDB`-backed implementation for production and an in-memory one for
//! tests.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use cloudmeter_store::{CachedToken, RocksStore, TokenCache};
//!
//! let store = RocksStore::open("/var/lib/cloudmeter").unwrap();
//! store
//!     .put_token(
//!         "admin",
//!         &CachedToken {
//!             token: "36ae5c015c7c47c79afd983125a0a1b4".into(),
//!             account_uuid: "acct-1".into(),
//!             issued_at: Utc::now(),
//!         },
//!     )
//!     .unwrap();
//! let cached = store.get_token("admin").unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session token persisted across runs, with enough context to decide
/// whether it is still fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    /// The session token itself.
    pub token: String,

    /// The account the token was issued for.
    pub account_uuid: String,

    /// When the token was obtained.
    pub issued_at: DateTime<Utc>,
}

impl CachedToken {
    /// Age of the token in whole seconds, zero when the clock went backwards.
    #[must_use]
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.issued_at).num_seconds().max(0)
    }
}

/// The durable token cache, keyed by account name.
///
/// Writes are best-effort for callers: the credential resolver logs a
/// failed persist and carries on with the in-memory copy.
pub trait TokenCache: Send + Sync {
    /// Look up the cached token for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn get_token(&self, account: &str) -> Result<Option<CachedToken>>;

    /// Store the token for an account, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn put_token(&self, account: &str, token: &CachedToken) -> Result<()>;
}

/// In-memory token cache for tests and one-off runs without a data
/// directory.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    tokens: Mutex<HashMap<String, CachedToken>>,
}

impl MemoryTokenCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenCache for MemoryTokenCache {
    fn get_token(&self, account: &str) -> Result<Option<CachedToken>> {
        let tokens = self
            .tokens
            .lock()
            .map_err(|_| StoreError::Database("token cache lock poisoned".into()))?;
        Ok(tokens.get(account).cloned())
    }

    fn put_token(&self, account: &str, token: &CachedToken) -> Result<()> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| StoreError::Database("token cache lock poisoned".into()))?;
        tokens.insert(account.to_string(), token.clone());
        Ok(())
    }
}
