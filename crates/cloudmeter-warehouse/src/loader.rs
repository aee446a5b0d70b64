//! The replace-by-date loader with bounded retries.

use std::time::Duration;

use chrono::NaiveDate;

use cloudmeter_core::BillingRecord;

use crate::client::WarehouseClient;
use crate::error::WarehouseError;
use crate::schema;

/// Loader behavior knobs.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Total insert attempts before giving up.
    pub max_insert_attempts: u32,

    /// Fixed delay between insert attempts.
    pub retry_delay: Duration,

    /// When set, a failed delete aborts the run instead of proceeding to
    /// insert. Off by default: the delete is an optimization against
    /// duplicate accumulation, not a transactional precondition.
    pub strict_replace: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_insert_attempts: 3,
            retry_delay: Duration::from_secs(2),
            strict_replace: false,
        }
    }
}

/// Loads record batches into the destination table, replacing the target
/// date's partition.
pub struct Loader {
    client: WarehouseClient,
    options: LoaderOptions,
}

impl Loader {
    /// Create a loader over the given client.
    #[must_use]
    pub fn new(client: WarehouseClient, options: LoaderOptions) -> Self {
        Self { client, options }
    }

    /// Create the destination table if it does not exist.
    ///
    /// # Errors
    ///
    /// Table-creation failure is fatal and propagated without retry.
    pub async fn ensure_table(&self) -> Result<(), WarehouseError> {
        if self.client.table_exists().await? {
            return Ok(());
        }

        tracing::info!(
            table = %self.client.target().qualified_name(),
            "Destination table missing; creating"
        );
        self.client.create_table().await
    }

    /// Replace the rows for one billing date with a new batch: delete the
    /// date's existing rows, then insert.
    ///
    /// # Errors
    ///
    /// Propagates insert failure after retries are exhausted; propagates
    /// delete failure only under [`LoaderOptions::strict_replace`].
    pub async fn replace_for_date(
        &self,
        date: NaiveDate,
        records: &[BillingRecord],
    ) -> Result<(), WarehouseError> {
        if let Err(error) = self.client.delete_for_date(date).await {
            if self.options.strict_replace {
                return Err(error);
            }
            tracing::warn!(
                %date,
                %error,
                "Delete of existing rows failed; proceeding to insert (duplicates possible)"
            );
        }

        self.insert(records).await
    }

    /// Insert a batch with bounded retries on transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last observed error once attempts are exhausted, or
    /// immediately on a non-transient error.
    pub async fn insert(&self, records: &[BillingRecord]) -> Result<(), WarehouseError> {
        if records.is_empty() {
            tracing::info!("No records to insert");
            return Ok(());
        }

        let mut attempt = 1;
        loop {
            match self.client.insert_all(records).await {
                Ok(()) => {
                    tracing::info!(rows = records.len(), attempt, "Insert succeeded");
                    return Ok(());
                }
                Err(error) if error.is_transient() && attempt < self.options.max_insert_attempts => {
                    self.log_transient(&error, attempt);
                    attempt += 1;
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn log_transient(&self, error: &WarehouseError, attempt: u32) {
        match error {
            WarehouseError::RowErrors { detail, .. } => {
                // The schema snapshot makes row rejections diagnosable
                // without re-running.
                tracing::warn!(
                    attempt,
                    %error,
                    rejections = %detail,
                    schema = %schema::fields_json(),
                    "Rows rejected; retrying"
                );
            }
            _ => {
                tracing::warn!(attempt, %error, "Transient warehouse error; retrying");
            }
        }
    }
}
