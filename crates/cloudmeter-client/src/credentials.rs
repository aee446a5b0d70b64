//! Credential resolution and the session-token lifecycle.
//!
//! Three credential sets are recognized, with a fixed precedence:
//!
//! 1. API key — sent as a `Bearer` header, no login call.
//! 2. Access-key pair — sent as a custom header pair, no login call.
//! 3. Account name and password — a session login exchange, with the
//!    resulting token cached in-run and durably so runs within the TTL skip
//!    the login.
//!
//! The upstream API also accepts HTTP Basic as a last-resort header form;
//! [`AuthScheme::Basic`] models it but the resolver never selects it on its
//! own.

use std::sync::Mutex;

use chrono::Utc;
use reqwest::RequestBuilder;

use cloudmeter_store::{CachedToken, TokenCache};

use crate::client::CloudClient;
use crate::error::ClientError;

/// Default session-token TTL: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Header carrying the access key in paired-key auth.
const ACCESS_KEY_HEADER: &str = "X-Access-Key";

/// Header carrying the access secret in paired-key auth.
const ACCESS_SECRET_HEADER: &str = "X-Access-Secret";

/// How a request authenticates against the upstream API.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`.
    ApiKey(String),

    /// Custom access-key/secret header pair.
    AccessKeyPair {
        /// The access key.
        key: String,
        /// The access secret.
        secret: String,
    },

    /// `Authorization: OAuth <session-token>` from a login exchange.
    Session(String),

    /// HTTP Basic, the upstream's last-resort header form.
    Basic {
        /// User name.
        user: String,
        /// Password.
        password: String,
    },
}

impl AuthScheme {
    /// Attach this scheme's headers to a request.
    #[must_use]
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::ApiKey(key) => request.header("Authorization", format!("Bearer {key}")),
            Self::AccessKeyPair { key, secret } => request
                .header(ACCESS_KEY_HEADER, key)
                .header(ACCESS_SECRET_HEADER, secret),
            Self::Session(token) => request.header("Authorization", format!("OAuth {token}")),
            Self::Basic { user, password } => request.basic_auth(user, Some(password)),
        }
    }
}

/// A resolved authentication context: the scheme to put on requests plus the
/// account every call is scoped to.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The header scheme to use.
    pub scheme: AuthScheme,

    /// The account all billing calls are made for.
    pub account_uuid: String,
}

/// The configured credential sets. At most one is used per run.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// API key for Bearer auth.
    pub api_key: Option<String>,

    /// Access key of a key pair.
    pub access_key: Option<String>,

    /// Access secret of a key pair.
    pub access_secret: Option<String>,

    /// Account name for session login.
    pub account_name: Option<String>,

    /// Account password for session login.
    pub account_password: Option<String>,

    /// Account uuid; required for key-based modes, a fallback for session
    /// mode when the login response carries none.
    pub account_uuid: Option<String>,

    /// Maximum age of a cached session token before a fresh login.
    pub token_ttl_seconds: i64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            access_key: None,
            access_secret: None,
            account_name: None,
            account_password: None,
            account_uuid: None,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }
}

/// Resolves an [`AuthContext`] from configuration, caching session tokens
/// in-run and through the durable [`TokenCache`].
pub struct CredentialResolver {
    config: CredentialConfig,
    // In-run cache; survives across the dates of a month backfill.
    session: Mutex<Option<CachedToken>>,
}

impl CredentialResolver {
    /// Create a resolver over the given configuration.
    #[must_use]
    pub fn new(config: CredentialConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// Resolve the authentication context, performing a login exchange only
    /// when session mode is selected and no fresh cached token exists.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingCredentials`] when no credential set is
    /// configured, [`ClientError::Configuration`] when a key-based mode
    /// lacks the account uuid, and [`ClientError::Auth`] when the upstream
    /// rejects the login or no usable session comes back.
    pub async fn resolve(
        &self,
        client: &CloudClient,
        cache: &dyn TokenCache,
    ) -> Result<AuthContext, ClientError> {
        if let Some(key) = &self.config.api_key {
            return Ok(AuthContext {
                scheme: AuthScheme::ApiKey(key.clone()),
                account_uuid: self.configured_account()?,
            });
        }

        if let (Some(key), Some(secret)) = (&self.config.access_key, &self.config.access_secret) {
            return Ok(AuthContext {
                scheme: AuthScheme::AccessKeyPair {
                    key: key.clone(),
                    secret: secret.clone(),
                },
                account_uuid: self.configured_account()?,
            });
        }

        if let (Some(name), Some(password)) =
            (&self.config.account_name, &self.config.account_password)
        {
            return self.resolve_session(client, cache, name, password).await;
        }

        Err(ClientError::MissingCredentials)
    }

    fn configured_account(&self) -> Result<String, ClientError> {
        self.config.account_uuid.clone().ok_or_else(|| {
            ClientError::Configuration("account uuid is required for key-based auth".into())
        })
    }

    async fn resolve_session(
        &self,
        client: &CloudClient,
        cache: &dyn TokenCache,
        account_name: &str,
        password: &str,
    ) -> Result<AuthContext, ClientError> {
        let now = Utc::now();
        let ttl = self.config.token_ttl_seconds;

        if let Some(cached) = self.fresh_in_run_token(ttl) {
            return Ok(session_context(&cached));
        }

        match cache.get_token(account_name) {
            Ok(Some(cached)) if cached.age_seconds(now) < ttl => {
                tracing::debug!(
                    account = account_name,
                    age_seconds = cached.age_seconds(now),
                    "Reusing durable session token"
                );
                self.remember(&cached);
                return Ok(session_context(&cached));
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%error, "Token cache read failed; logging in fresh");
            }
        }

        // A rejected login is an authentication failure, not a generic
        // upstream API error; transport failures stay as they are.
        let session = client
            .log_in(account_name, password)
            .await
            .map_err(|error| match error {
                ClientError::Api { status, body } => {
                    ClientError::Auth(format!("login rejected: {status} - {body}"))
                }
                other => other,
            })?;
        let account_uuid = session
            .account_uuid
            .or_else(|| self.config.account_uuid.clone())
            .ok_or_else(|| {
                ClientError::Auth("login response carried no account uuid and none is configured".into())
            })?;

        let token = CachedToken {
            token: session.token,
            account_uuid,
            issued_at: now,
        };
        self.remember(&token);

        // Best-effort persist; a failure here only costs a login next run.
        if let Err(error) = cache.put_token(account_name, &token) {
            tracing::warn!(%error, "Failed to persist session token");
        }

        Ok(session_context(&token))
    }

    fn fresh_in_run_token(&self, ttl: i64) -> Option<CachedToken> {
        let guard = self.session.lock().ok()?;
        guard
            .as_ref()
            .filter(|cached| cached.age_seconds(Utc::now()) < ttl)
            .cloned()
    }

    fn remember(&self, token: &CachedToken) {
        if let Ok(mut guard) = self.session.lock() {
            *guard = Some(token.clone());
        }
    }
}

fn session_context(token: &CachedToken) -> AuthContext {
    AuthContext {
        scheme: AuthScheme::Session(token.token.clone()),
        account_uuid: token.account_uuid.clone(),
    }
}
