use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds a ledger record survives after its last write.
pub const RETRY_RECORD_TTL_SECS: i64 = 86_400;

/// Process-wide retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Persisted retry counter for one correlation id.
///
/// Stored as `{correlationId, retryCount, ttl}` with `ttl` in epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryRecord {
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    #[serde(rename = "retryCount")]
    pub retry_count: u32,
    #[serde(rename = "ttl", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl RetryRecord {
    pub fn new(correlation_id: impl Into<String>, retry_count: u32, now: DateTime<Utc>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            retry_count,
            expires_at: now + Duration::seconds(RETRY_RECORD_TTL_SECS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}
