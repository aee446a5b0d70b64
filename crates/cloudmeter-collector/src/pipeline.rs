//! The collection pipeline and its date-range drivers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use cloudmeter_client::{CloudClient, CredentialResolver, ReferenceCache};
use cloudmeter_core::window::{days_in_month, parse_date, parse_month, previous_month};
use cloudmeter_core::{normalize, BillingWindow};
use cloudmeter_store::TokenCache;
use cloudmeter_warehouse::{Loader, LoaderOptions, WarehouseClient};

use crate::config::CollectorConfig;
use crate::error::CollectError;

/// Result of one date's collection.
#[derive(Debug, Clone)]
pub struct DateSummary {
    /// The collected date.
    pub date: NaiveDate,

    /// How many records were loaded.
    pub record_count: usize,
}

/// One day's outcome within a month backfill.
#[derive(Debug)]
pub struct DayOutcome {
    /// The day.
    pub date: NaiveDate,

    /// The day's result; a failure here never aborts the remaining days.
    pub result: Result<DateSummary, CollectError>,
}

/// Drives the pipeline: credentials, billing retrieval, reference data,
/// normalization, warehouse load.
///
/// Holds the run-scoped caches (session token, reference data), so a month
/// backfill shares one login and one reference fetch across all its days.
pub struct Collector {
    config: CollectorConfig,
    client: CloudClient,
    resolver: CredentialResolver,
    references: ReferenceCache,
    loader: Loader,
    token_cache: Arc<dyn TokenCache>,
}

impl Collector {
    /// Build a collector from configuration and a token cache.
    #[must_use]
    pub fn new(config: CollectorConfig, token_cache: Arc<dyn TokenCache>) -> Self {
        let mut client = CloudClient::new(config.cloud_base_url.clone());
        if let Some(path) = &config.login_path {
            client = client.with_login_path(path.clone());
        }
        if let Some(path) = &config.billing_path {
            client = client.with_billing_path(path.clone());
        }
        if let Some(query) = &config.extra_query {
            client = client.with_extra_query(query);
        }

        let warehouse = WarehouseClient::new(
            config.warehouse_base_url.clone(),
            config.warehouse_target.clone(),
        );
        let loader = Loader::new(
            warehouse,
            LoaderOptions {
                strict_replace: config.strict_replace,
                ..LoaderOptions::default()
            },
        );

        Self {
            resolver: CredentialResolver::new(config.credentials.clone()),
            references: ReferenceCache::new(),
            client,
            loader,
            config,
            token_cache,
        }
    }

    /// Collect one date given as `YYYY-MM-DD`.
    ///
    /// Idempotent: re-running for the same date replaces that date's rows.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid input, credential failure, an upstream
    /// non-2xx, or a warehouse failure after retries.
    pub async fn collect_for_date(&self, date_str: &str) -> Result<DateSummary, CollectError> {
        let date = parse_date(date_str)?;
        self.collect_date(date).await
    }

    /// Collect yesterday (in the configured time zone) — the scheduled case.
    ///
    /// # Errors
    ///
    /// As [`Collector::collect_for_date`].
    pub async fn collect_daily(&self) -> Result<DateSummary, CollectError> {
        let today = Utc::now()
            .with_timezone(&self.config.timezone_offset)
            .date_naive();
        let yesterday = today.pred_opt().ok_or_else(|| {
            CollectError::Configuration("date arithmetic underflow computing yesterday".into())
        })?;

        tracing::info!(date = %yesterday, "Collecting yesterday's spending");
        self.collect_date(yesterday).await
    }

    /// Backfill every day of a `YYYY-MM` month, sequentially with pacing.
    ///
    /// A single day's failure is recorded in its outcome and does not abort
    /// the remaining days.
    ///
    /// # Errors
    ///
    /// Only the month string failing to parse is fatal here.
    pub async fn collect_for_month(&self, month_str: &str) -> Result<Vec<DayOutcome>, CollectError> {
        let (year, month) = parse_month(month_str)?;
        let days = days_in_month(year, month);
        let pacing = Duration::from_millis(self.config.month_pacing_ms);

        tracing::info!(month = month_str, day_count = days.len(), "Starting month backfill");

        let mut outcomes = Vec::with_capacity(days.len());
        for (index, date) in days.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(pacing).await;
            }

            let result = self.collect_date(*date).await;
            if let Err(error) = &result {
                tracing::error!(%date, %error, "Day failed; continuing with remaining days");
            }
            outcomes.push(DayOutcome {
                date: *date,
                result,
            });
        }

        Ok(outcomes)
    }

    /// Backfill the previous calendar month (in the configured time zone).
    ///
    /// # Errors
    ///
    /// As [`Collector::collect_for_month`].
    pub async fn collect_for_previous_month(&self) -> Result<Vec<DayOutcome>, CollectError> {
        let today = Utc::now()
            .with_timezone(&self.config.timezone_offset)
            .date_naive();
        let (year, month) = previous_month(today);
        self.collect_for_month(&format!("{year:04}-{month:02}")).await
    }

    /// The single-date pipeline.
    async fn collect_date(&self, date: NaiveDate) -> Result<DateSummary, CollectError> {
        let window = BillingWindow::for_date(date, self.config.timezone_offset);
        let auth = self
            .resolver
            .resolve(&self.client, self.token_cache.as_ref())
            .await?;

        self.loader.ensure_table().await?;

        let spending = self.client.fetch_spending(&auth, &window).await?;
        tracing::debug!(
            date = %date,
            entry_count = spending.len(),
            "Fetched spending payload"
        );

        let refs = self.references.reference_data(&self.client, &auth).await;
        let records = normalize(&spending, &window, &auth.account_uuid, &refs);

        self.loader.replace_for_date(date, &records).await?;

        tracing::info!(date = %date, records = records.len(), "Date collected");
        Ok(DateSummary {
            date,
            record_count: records.len(),
        })
    }
}
