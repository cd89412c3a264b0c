//! Key Store
//!
//! Narrow interface over the key-record and request-log collections. The
//! admin surface that creates and deletes keys is a separate consumer of
//! the same store; the gateway core only reads records, applies resets,
//! and appends to the request log.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rate-limit tier of an issued key
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KeyTier {
    #[default]
    Basic,
    Pro,
}

/// One record per issued API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Opaque key value, primary lookup key
    pub api_key: String,

    /// Tier selecting the rate-limit row
    pub key_type: KeyTier,

    /// Requests consumed since the last reset
    pub daily_count: u64,

    /// Most recent quota reset applied to this record
    pub last_reset: DateTime<Utc>,
}

/// The store operations the gateway core requires
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Look up a record by key value.
    async fn find_by_key(&self, api_key: &str) -> Result<Option<KeyRecord>>;

    /// Set a record's daily count and reset timestamp in one write.
    async fn update_reset_and_count(
        &self,
        api_key: &str,
        new_count: u64,
        new_reset: DateTime<Utc>,
    ) -> Result<()>;

    /// Increment a record's daily count.
    async fn increment_count(&self, api_key: &str, delta: u64) -> Result<()>;

    /// Count request-log entries for a key at or after `since`.
    async fn count_log_entries(&self, api_key: &str, since: DateTime<Utc>) -> Result<u64>;

    /// Append a request-log entry for a key.
    async fn append_log_entry(&self, api_key: &str, timestamp: DateTime<Utc>) -> Result<()>;
}
