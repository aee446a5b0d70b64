//! Collector error type aggregating the pipeline components.

use cloudmeter_client::ClientError;
use cloudmeter_core::CoreError;
use cloudmeter_store::StoreError;
use cloudmeter_warehouse::WarehouseError;

/// Errors surfaced by the collector entry points.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Invalid date/month input or window math failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Upstream API or credential failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Token-cache storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Warehouse failure after any retries.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// Missing or contradictory configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
