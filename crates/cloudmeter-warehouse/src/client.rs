//! REST client for the warehouse's table, query, and streaming-insert
//! services.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use cloudmeter_core::BillingRecord;

use crate::error::WarehouseError;
use crate::schema;

/// Identifies the destination table.
#[derive(Debug, Clone)]
pub struct WarehouseTarget {
    /// Project identifier.
    pub project: String,

    /// Dataset identifier.
    pub dataset: String,

    /// Table identifier.
    pub table: String,
}

impl WarehouseTarget {
    /// Fully qualified table name for query statements.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("`{}.{}.{}`", self.project, self.dataset, self.table)
    }
}

/// Client for the warehouse REST API.
#[derive(Debug, Clone)]
pub struct WarehouseClient {
    http: Client,
    base_url: String,
    target: WarehouseTarget,
}

impl WarehouseClient {
    /// Create a client for the given warehouse base URL and target table.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn new(base_url: impl Into<String>, target: WarehouseTarget) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            target,
        }
    }

    /// The destination table.
    #[must_use]
    pub fn target(&self) -> &WarehouseTarget {
        &self.target
    }

    fn tables_url(&self) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables",
            self.base_url, self.target.project, self.target.dataset
        )
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.tables_url(), self.target.table)
    }

    fn queries_url(&self) -> String {
        format!("{}/projects/{}/queries", self.base_url, self.target.project)
    }

    /// Whether the destination table exists.
    ///
    /// # Errors
    ///
    /// Returns a non-transient [`WarehouseError::Api`] on any status other
    /// than success or 404.
    pub async fn table_exists(&self) -> Result<bool, WarehouseError> {
        let response = self.http.get(self.table_url()).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if response.status().is_success() {
            return Ok(true);
        }
        Err(api_error(response, false).await)
    }

    /// Create the destination table with the fixed schema and daily
    /// partitioning.
    ///
    /// # Errors
    ///
    /// Returns a non-transient [`WarehouseError::Api`] on failure; table
    /// creation is never retried.
    pub async fn create_table(&self) -> Result<(), WarehouseError> {
        let body = json!({
            "tableReference": {
                "projectId": self.target.project,
                "datasetId": self.target.dataset,
                "tableId": self.target.table,
            },
            "schema": { "fields": schema::fields_json() },
            "timePartitioning": { "type": "DAY", "field": schema::PARTITION_FIELD },
        });

        let response = self.http.post(self.tables_url()).json(&body).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(api_error(response, false).await)
    }

    /// Delete all rows for the given billing date.
    ///
    /// # Errors
    ///
    /// Returns a non-transient [`WarehouseError::Api`] on failure.
    pub async fn delete_for_date(&self, date: NaiveDate) -> Result<(), WarehouseError> {
        let statement = format!(
            "DELETE FROM {} WHERE {} = '{}'",
            self.target.qualified_name(),
            schema::PARTITION_FIELD,
            date.format("%Y-%m-%d")
        );
        let body = json!({ "query": statement, "useLegacySql": false });

        let response = self
            .http
            .post(self.queries_url())
            .json(&body)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(api_error(response, false).await)
    }

    /// Stream-insert a record batch.
    ///
    /// A 404 here is classified transient: the table was just created and
    /// is not yet visible to the insert service. Row-level rejections come
    /// back as [`WarehouseError::RowErrors`], also transient.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::RowErrors`] on row rejections, a transient
    /// [`WarehouseError::Api`] on 404, and a non-transient one otherwise.
    pub async fn insert_all(&self, records: &[BillingRecord]) -> Result<(), WarehouseError> {
        let rows: Vec<Value> = records
            .iter()
            .map(|record| Ok(json!({ "json": serde_json::to_value(record)? })))
            .collect::<Result<_, serde_json::Error>>()?;
        let body = json!({ "rows": rows });

        let url = format!("{}/insertAll", self.table_url());
        let response = self.http.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let transient = response.status() == StatusCode::NOT_FOUND;
            return Err(api_error(response, transient).await);
        }

        let result: InsertResponse = response.json().await?;
        if result.insert_errors.is_empty() {
            return Ok(());
        }

        let detail = serde_json::to_string(&result.insert_errors)?;
        Err(WarehouseError::RowErrors {
            failed: result.insert_errors.len(),
            total: records.len(),
            detail,
        })
    }
}

async fn api_error(response: reqwest::Response, transient: bool) -> WarehouseError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    WarehouseError::Api {
        status,
        body,
        transient,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertResponse {
    #[serde(default)]
    insert_errors: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> WarehouseTarget {
        WarehouseTarget {
            project: "analytics".into(),
            dataset: "billing".into(),
            table: "cloud_spending".into(),
        }
    }

    #[test]
    fn qualified_name_is_backticked() {
        assert_eq!(
            target().qualified_name(),
            "`analytics.billing.cloud_spending`"
        );
    }

    #[test]
    fn urls_compose() {
        let client = WarehouseClient::new("http://wh.local/v2/", target());
        assert_eq!(
            client.table_url(),
            "http://wh.local/v2/projects/analytics/datasets/billing/tables/cloud_spending"
        );
        assert_eq!(
            client.queries_url(),
            "http://wh.local/v2/projects/analytics/queries"
        );
    }
}
