//! `RocksDB`-backed token cache.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};

use crate::error::{Result, StoreError};
use crate::schema::{all_column_families, cf};
use crate::{CachedToken, TokenCache};

/// `RocksDB`-backed implementation of [`TokenCache`].
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl TokenCache for RocksStore {
    fn get_token(&self, account: &str) -> Result<Option<CachedToken>> {
        let cf = self.cf(cf::SESSION_TOKENS)?;
        let data = self
            .db
            .get_cf(&cf, account.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        data.map(|bytes| Self::deserialize(&bytes)).transpose()
    }

    fn put_token(&self, account: &str, token: &CachedToken) -> Result<()> {
        let cf = self.cf(cf::SESSION_TOKENS)?;
        let value = Self::serialize(token)?;

        self.db
            .put_cf(&cf, account.as_bytes(), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn round_trip_survives_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let store = RocksStore::open(dir.path()).unwrap();
            let token = CachedToken {
                token: "36ae5c015c7c47c79afd983125a0a1b4".into(),
                account_uuid: "acct-1".into(),
                issued_at: Utc::now(),
            };
            store.put_token("admin", &token).unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let cached = store.get_token("admin").unwrap().unwrap();
        assert_eq!(cached.token, "36ae5c015c7c47c79afd983125a0a1b4");
        assert_eq!(cached.account_uuid, "acct-1");
    }

    #[test]
    fn missing_account_is_none() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        assert!(store.get_token("nobody").unwrap().is_none());
    }

    #[test]
    fn put_replaces_previous_token() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        let issued_at = Utc::now();
        for token in ["first", "second"] {
            store
                .put_token(
                    "admin",
                    &CachedToken {
                        token: token.into(),
                        account_uuid: "acct-1".into(),
                        issued_at,
                    },
                )
                .unwrap();
        }

        assert_eq!(store.get_token("admin").unwrap().unwrap().token, "second");
    }
}
