//! Error type for upstream API operations.

/// Errors that can occur talking to the upstream cloud API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream API returned a non-2xx status. The body is kept
    /// verbatim for diagnostics.
    #[error("upstream API error: {status} - {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Response payload did not deserialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No credential set is configured.
    #[error("no credential set configured: set an API key, an access-key pair, or an account name and password")]
    MissingCredentials,

    /// Login succeeded at the transport level but no usable session came
    /// back, or required account context is missing.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Contradictory or incomplete configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
