//! Collector configuration.
//!
//! Loaded from environment variables, with the credential set optionally
//! coming from a `.secrets/cloud.json` file (environment variables as the
//! fallback).

use std::path::Path;

use chrono::FixedOffset;
use serde::Deserialize;

use cloudmeter_client::{CredentialConfig, DEFAULT_TOKEN_TTL_SECONDS};
use cloudmeter_core::window::parse_offset;
use cloudmeter_warehouse::WarehouseTarget;

use crate::error::CollectError;

/// Collector configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Upstream cloud API base URL.
    pub cloud_base_url: String,

    /// Login endpoint path override.
    pub login_path: Option<String>,

    /// Spending endpoint path-prefix override.
    pub billing_path: Option<String>,

    /// Extra query string appended to every upstream request.
    pub extra_query: Option<String>,

    /// The configured credential set.
    pub credentials: CredentialConfig,

    /// Fixed UTC offset all billing windows are computed in.
    pub timezone_offset: FixedOffset,

    /// Token-cache data directory.
    pub data_dir: String,

    /// Warehouse REST base URL.
    pub warehouse_base_url: String,

    /// Destination table.
    pub warehouse_target: WarehouseTarget,

    /// Treat a failed delete-before-insert as fatal.
    pub strict_replace: bool,

    /// Delay between days of a month backfill, in milliseconds.
    pub month_pacing_ms: u64,
}

/// Cloud credential secrets file structure.
#[derive(Debug, Deserialize)]
struct CloudSecrets {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    access_key: Option<String>,
    #[serde(default)]
    access_secret: Option<String>,
    #[serde(default)]
    account_name: Option<String>,
    #[serde(default)]
    account_password: Option<String>,
    #[serde(default)]
    account_uuid: Option<String>,
}

impl CollectorConfig {
    /// Load configuration from environment variables and the secrets file.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Configuration`] when a required identifier is
    /// missing or the time zone offset does not parse.
    pub fn from_env() -> Result<Self, CollectError> {
        let timezone_offset = match std::env::var("TIMEZONE_OFFSET") {
            Ok(raw) => parse_offset(&raw)
                .map_err(|e| CollectError::Configuration(e.to_string()))?,
            // INVARIANT: +00:00 always parses.
            Err(_) => parse_offset("+00:00").expect("utc offset"),
        };

        Ok(Self {
            cloud_base_url: require_env("CLOUD_BASE_URL")?,
            login_path: std::env::var("CLOUD_LOGIN_PATH").ok(),
            billing_path: std::env::var("CLOUD_BILLING_PATH").ok(),
            extra_query: std::env::var("CLOUD_EXTRA_QUERY").ok(),
            credentials: load_credentials(),
            timezone_offset,
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/var/lib/cloudmeter".into()),
            warehouse_base_url: require_env("WAREHOUSE_BASE_URL")?,
            warehouse_target: WarehouseTarget {
                project: require_env("WAREHOUSE_PROJECT")?,
                dataset: require_env("WAREHOUSE_DATASET")?,
                table: std::env::var("WAREHOUSE_TABLE")
                    .unwrap_or_else(|_| "cloud_spending".into()),
            },
            strict_replace: std::env::var("STRICT_REPLACE")
                .map(|raw| raw == "true" || raw == "1")
                .unwrap_or(false),
            month_pacing_ms: std::env::var("MONTH_PACING_MS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(1000),
        })
    }
}

fn require_env(name: &str) -> Result<String, CollectError> {
    std::env::var(name).map_err(|_| CollectError::Configuration(format!("{name} is not set")))
}

/// Load the credential set from file or environment.
fn load_credentials() -> CredentialConfig {
    let token_ttl_seconds = std::env::var("TOKEN_TTL_SECONDS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);

    let secret_paths = [
        ".secrets/cloud.json",
        "cloudmeter/.secrets/cloud.json",
        "../.secrets/cloud.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<CloudSecrets>(path) {
            tracing::info!(path = %path, "Loaded cloud credentials from file");
            return CredentialConfig {
                api_key: secrets.api_key,
                access_key: secrets.access_key,
                access_secret: secrets.access_secret,
                account_name: secrets.account_name,
                account_password: secrets.account_password,
                account_uuid: secrets.account_uuid,
                token_ttl_seconds,
            };
        }
    }

    tracing::debug!("Cloud secrets file not found, using environment variables");
    CredentialConfig {
        api_key: std::env::var("CLOUD_API_KEY").ok(),
        access_key: std::env::var("CLOUD_ACCESS_KEY").ok(),
        access_secret: std::env::var("CLOUD_ACCESS_SECRET").ok(),
        account_name: std::env::var("CLOUD_ACCOUNT_NAME").ok(),
        account_password: std::env::var("CLOUD_ACCOUNT_PASSWORD").ok(),
        account_uuid: std::env::var("CLOUD_ACCOUNT_UUID").ok(),
        token_ttl_seconds,
    }
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
