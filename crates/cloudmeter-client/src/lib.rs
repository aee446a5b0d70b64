//! Upstream cloud API client for cloudmeter.
//!
//! This crate talks to the private cloud management API: the login exchange,
//! the spending-calculation endpoint, and the reference-data listings (price
//! tables, prices, VM inventory). It also owns credential resolution — which
//! of the configured credential sets to use, and the session-token cache for
//! login-based auth — and the run-scoped reference-data cache.
//!
//! # Example
//!
//! ```no_run
//! use cloudmeter_client::{CloudClient, CredentialConfig, CredentialResolver};
//! use cloudmeter_store::MemoryTokenCache;
//!
//! # async fn example() -> Result<(), cloudmeter_client::ClientError> {
//! let client = CloudClient::new("https://cloud.internal:8080/zstack/v1");
//! let resolver = CredentialResolver::new(CredentialConfig {
//!     api_key: Some("service-api-key".into()),
//!     account_uuid: Some("acct-uuid".into()),
//!     ..CredentialConfig::default()
//! });
//!
//! let auth = resolver.resolve(&client, &MemoryTokenCache::new()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod credentials;
mod crypto;
mod error;
mod reference;

pub use client::{CloudClient, LoginSession};
pub use credentials::{
    AuthContext, AuthScheme, CredentialConfig, CredentialResolver, DEFAULT_TOKEN_TTL_SECONDS,
};
pub use crypto::sha512_hex;
pub use error::ClientError;
pub use reference::ReferenceCache;
