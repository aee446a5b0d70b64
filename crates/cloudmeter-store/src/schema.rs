//! Column family layout for the `RocksDB` database.

/// Column family names.
pub mod cf {
    /// Cached upstream session tokens, keyed by account name.
    pub const SESSION_TOKENS: &str = "session_tokens";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::SESSION_TOKENS]
}
