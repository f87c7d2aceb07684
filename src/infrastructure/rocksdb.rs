use crate::domain::ports::RetryLedger;
use crate::domain::retry::RetryRecord;
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding retry records keyed by correlation id.
pub const CF_RETRY_LEDGER: &str = "retry_ledger";

impl From<rocksdb::Error> for ProvisionError {
    fn from(e: rocksdb::Error) -> Self {
        ProvisionError::Ledger(e.to_string())
    }
}

/// A durable retry ledger backed by RocksDB.
///
/// Records are stored as JSON `{correlationId, retryCount, ttl}`. RocksDB has
/// no native expiry here, so expired records are treated as absent on read
/// and removed lazily.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBRetryLedger {
    db: Arc<DB>,
}

impl RocksDBRetryLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_ledger = ColumnFamilyDescriptor::new(CF_RETRY_LEDGER, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_ledger])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn column_family(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_RETRY_LEDGER)
            .ok_or_else(|| ProvisionError::Ledger("retry ledger column family not found".to_string()))
    }
}

#[async_trait]
impl RetryLedger for RocksDBRetryLedger {
    async fn get(&self, correlation_id: &str) -> Result<u32> {
        let cf = self.column_family()?;
        let Some(bytes) = self.db.get_cf(cf, correlation_id.as_bytes())? else {
            return Ok(0);
        };

        let record: RetryRecord = serde_json::from_slice(&bytes)
            .map_err(|e| ProvisionError::Ledger(format!("corrupt retry record: {e}")))?;
        if record.is_expired(Utc::now()) {
            self.db.delete_cf(cf, correlation_id.as_bytes())?;
            return Ok(0);
        }
        Ok(record.retry_count)
    }

    async fn set(&self, correlation_id: &str, retry_count: u32) -> Result<()> {
        let cf = self.column_family()?;
        let record = RetryRecord::new(correlation_id, retry_count, Utc::now());
        let value = serde_json::to_vec(&record)
            .map_err(|e| ProvisionError::Ledger(format!("Serialization error: {e}")))?;
        self.db.put_cf(cf, correlation_id.as_bytes(), value)?;
        Ok(())
    }

    async fn delete(&self, correlation_id: &str) -> Result<()> {
        let cf = self.column_family()?;
        self.db.delete_cf(cf, correlation_id.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = RocksDBRetryLedger::open(dir.path()).unwrap();
            ledger.set("123", 3).await.unwrap();
        }

        let ledger = RocksDBRetryLedger::open(dir.path()).unwrap();
        assert_eq!(ledger.get("123").await.unwrap(), 3);

        ledger.delete("123").await.unwrap();
        assert_eq!(ledger.get("123").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_record_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = RocksDBRetryLedger::open(dir.path()).unwrap();

        let stale = RetryRecord::new("123", 5, Utc::now() - Duration::days(2));
        let cf = ledger.column_family().unwrap();
        ledger
            .db
            .put_cf(cf, b"123", serde_json::to_vec(&stale).unwrap())
            .unwrap();

        assert_eq!(ledger.get("123").await.unwrap(), 0);
        assert!(ledger.db.get_cf(cf, b"123").unwrap().is_none());
    }
}
