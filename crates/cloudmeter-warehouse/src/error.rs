//! Error type for warehouse operations.

/// Errors that can occur talking to the warehouse.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The warehouse returned a non-2xx status.
    ///
    /// `transient` is set by the client where the condition is detected —
    /// a missing table shortly after creation is the warehouse's eventual
    /// consistency, not a caller bug.
    #[error("warehouse API error: {status} - {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
        /// Whether retrying the same request may succeed.
        transient: bool,
    },

    /// The streaming insert rejected individual rows.
    #[error("{failed} of {total} rows rejected: {detail}")]
    RowErrors {
        /// Number of rejected rows.
        failed: usize,
        /// Batch size.
        total: usize,
        /// Rejection detail as reported by the warehouse.
        detail: String,
    },

    /// Request or response payload did not serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WarehouseError {
    /// Whether a bounded retry of the same operation is worthwhile.
    ///
    /// Row-level rejections and eventual-consistency visibility errors are
    /// transient; everything else fails immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Api {
                transient: true,
                ..
            } | Self::RowErrors { .. }
        )
    }
}
