//! HTTP client for the cloud management API.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use cloudmeter_core::{BillingWindow, PriceEntry, PriceTableRef, SpendingEntry, VmInventory};

use crate::credentials::{AuthContext, AuthScheme};
use crate::crypto::sha512_hex;
use crate::error::ClientError;

/// Default path of the login endpoint, relative to the base URL.
const DEFAULT_LOGIN_PATH: &str = "/accounts/login";

/// Default path prefix of the spending-calculation endpoint.
const DEFAULT_BILLING_PATH: &str = "/billings/accounts";

/// A session obtained from the login exchange.
#[derive(Debug, Clone)]
pub struct LoginSession {
    /// The session token.
    pub token: String,

    /// The account uuid the response carried, when one was found.
    pub account_uuid: Option<String>,
}

/// Client for the upstream cloud management API.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: Client,
    base_url: String,
    login_path: String,
    billing_path: String,
    extra_query: Vec<(String, String)>,
}

impl CloudClient {
    /// Create a client for the given API base URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            billing_path: DEFAULT_BILLING_PATH.to_string(),
            extra_query: Vec::new(),
        }
    }

    /// Override the login endpoint path.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Override the spending endpoint path prefix.
    #[must_use]
    pub fn with_billing_path(mut self, path: impl Into<String>) -> Self {
        self.billing_path = path.into();
        self
    }

    /// Append extra query parameters (`"a=1&b=2"`) to every request.
    #[must_use]
    pub fn with_extra_query(mut self, query: &str) -> Self {
        self.extra_query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        self
    }

    /// Perform the login exchange for a session token.
    ///
    /// The password is SHA-512-hashed before transmission.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] on a non-2xx response and
    /// [`ClientError::Auth`] when no session token can be parsed out of the
    /// response.
    pub async fn log_in(
        &self,
        account_name: &str,
        password: &str,
    ) -> Result<LoginSession, ClientError> {
        let url = format!("{}{}", self.base_url, self.login_path);
        let body = json!({
            "logInByAccount": {
                "accountName": account_name,
                "password": sha512_hex(password),
            }
        });

        let response = self
            .request(Method::PUT, &url, None)
            .json(&body)
            .send()
            .await?;
        let value: Value = self.handle_response(response).await?;

        parse_login_session(&value)
            .ok_or_else(|| ClientError::Auth("no session token in login response".into()))
    }

    /// Call the spending-calculation endpoint for a billing window.
    ///
    /// Returns the payload's `spending` array, empty when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] on a non-2xx response, with the response
    /// body attached for diagnostics.
    pub async fn fetch_spending(
        &self,
        auth: &AuthContext,
        window: &BillingWindow,
    ) -> Result<Vec<SpendingEntry>, ClientError> {
        let url = format!(
            "{}{}/{}/actions",
            self.base_url, self.billing_path, auth.account_uuid
        );
        let body = json!({
            "calculateAccountSpending": {
                "dateStart": window.start_ms,
                "dateEnd": window.end_ms,
            },
            "systemTags": [],
            "userTags": [],
        });

        let response = self
            .request(Method::PUT, &url, Some(&auth.scheme))
            .json(&body)
            .send()
            .await?;
        let value: Value = self.handle_response(response).await?;

        match value.get("spending") {
            Some(spending) => Ok(serde_json::from_value(spending.clone())?),
            None => Ok(Vec::new()),
        }
    }

    /// List the account-to-price-table references.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] on a non-2xx response.
    pub async fn price_table_refs(
        &self,
        auth: &AuthContext,
    ) -> Result<Vec<PriceTableRef>, ClientError> {
        self.get_inventories(auth, "/accounts/price-tables/refs")
            .await
    }

    /// List all price entries across price tables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] on a non-2xx response.
    pub async fn list_prices(&self, auth: &AuthContext) -> Result<Vec<PriceEntry>, ClientError> {
        self.get_inventories(auth, "/billings/prices").await
    }

    /// List the VM inventory with attached volumes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] on a non-2xx response.
    pub async fn list_vm_instances(
        &self,
        auth: &AuthContext,
    ) -> Result<Vec<VmInventory>, ClientError> {
        self.get_inventories(auth, "/vm-instances").await
    }

    async fn get_inventories<T: DeserializeOwned>(
        &self,
        auth: &AuthContext,
        path: &str,
    ) -> Result<Vec<T>, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .request(Method::GET, &url, Some(&auth.scheme))
            .send()
            .await?;
        let listing: InventoryListing<T> = self.handle_response(response).await?;
        Ok(listing.inventories)
    }

    fn request(&self, method: Method, url: &str, auth: Option<&AuthScheme>) -> RequestBuilder {
        let mut request = self.http.request(method, url);
        if !self.extra_query.is_empty() {
            request = request.query(&self.extra_query);
        }
        if let Some(scheme) = auth {
            request = scheme.apply(request);
        }
        request
    }

    /// Parse a successful response, or surface the status and body.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// Listing responses wrap their payload in an `inventories` array.
#[derive(serde::Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct InventoryListing<T> {
    #[serde(default)]
    inventories: Vec<T>,
}

/// Extract the session from a login response.
///
/// Known response shapes are tried first (`inventory.uuid` for the token,
/// `inventory.accountUuid` then `inventory.userUuid` for the account); when
/// those paths yield nothing, a bounded-depth walk over the whole payload
/// looks for any 32-hex-character token-shaped string as a last resort.
fn parse_login_session(value: &Value) -> Option<LoginSession> {
    let inventory = value.get("inventory");

    let token = inventory
        .and_then(|inv| inv.get("uuid"))
        .and_then(Value::as_str)
        .filter(|uuid| looks_like_token(uuid))
        .map(str::to_string)
        .or_else(|| find_token(value, 6).map(str::to_string))?;

    let account_uuid = inventory
        .and_then(|inv| {
            inv.get("accountUuid")
                .or_else(|| inv.get("userUuid"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);

    Some(LoginSession {
        token,
        account_uuid,
    })
}

/// Depth-bounded scan for a token-shaped string anywhere in the payload.
fn find_token(value: &Value, depth: u8) -> Option<&str> {
    if depth == 0 {
        return None;
    }
    match value {
        Value::String(text) if looks_like_token(text) => Some(text),
        Value::Object(map) => map.values().find_map(|child| find_token(child, depth - 1)),
        Value::Array(items) => items.iter().find_map(|child| find_token(child, depth - 1)),
        _ => None,
    }
}

/// Session tokens are 32 lowercase-hex characters (a uuid with dashes
/// stripped).
fn looks_like_token(text: &str) -> bool {
    text.len() == 32 && text.bytes().all(|b| b.is_ascii_hexdigit())
}
