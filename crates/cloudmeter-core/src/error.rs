//! Error types for cloudmeter core.

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Date string did not parse as `YYYY-MM-DD`.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Month string did not parse as `YYYY-MM`.
    #[error("invalid month: {0}")]
    InvalidMonth(String),

    /// Time zone offset string did not parse as `+HH:MM` / `-HH:MM`.
    #[error("invalid time zone offset: {0}")]
    InvalidOffset(String),
}
