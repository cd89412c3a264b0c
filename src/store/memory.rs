//! In-Memory Key Store
//!
//! Process-local implementation of [`KeyStore`]. Backs the default binary
//! and all tests; deployments with durability requirements plug in their
//! own implementation of the trait.

use crate::error::{GatewayError, Result};
use crate::store::{KeyRecord, KeyStore, KeyTier};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

/// In-memory key-record and request-log store
pub struct MemoryStore {
    records: RwLock<HashMap<String, KeyRecord>>,

    /// Per-key request timestamps, oldest first
    log: RwLock<HashMap<String, VecDeque<DateTime<Utc>>>>,

    /// Entries older than this are pruned on append
    retention: Duration,
}

impl MemoryStore {
    /// Create a store with the given log retention window, in seconds.
    /// The window is clamped to at least the 60-second counting window.
    pub fn new(retention_secs: u64) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            log: RwLock::new(HashMap::new()),
            retention: Duration::seconds(retention_secs.max(60) as i64),
        }
    }

    /// Insert or replace a key record. Used by key provisioning and tests.
    pub fn put_record(&self, record: KeyRecord) {
        self.records
            .write()
            .insert(record.api_key.clone(), record);
    }

    /// Register a key with a fresh record. The reset timestamp is
    /// backdated so the first request after creation applies a reset.
    pub fn register_key(&self, api_key: &str, tier: KeyTier) {
        self.put_record(KeyRecord {
            api_key: api_key.to_string(),
            key_type: tier,
            daily_count: 0,
            last_reset: Utc::now() - Duration::days(1),
        });
    }

    /// Number of log entries currently held for a key.
    pub fn log_len(&self, api_key: &str) -> usize {
        self.log.read().get(api_key).map_or(0, VecDeque::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(120)
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn find_by_key(&self, api_key: &str) -> Result<Option<KeyRecord>> {
        Ok(self.records.read().get(api_key).cloned())
    }

    async fn update_reset_and_count(
        &self,
        api_key: &str,
        new_count: u64,
        new_reset: DateTime<Utc>,
    ) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(api_key)
            .ok_or_else(|| GatewayError::Store(format!("Unknown key '{}'", api_key)))?;
        record.daily_count = new_count;
        record.last_reset = new_reset;
        Ok(())
    }

    async fn increment_count(&self, api_key: &str, delta: u64) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(api_key)
            .ok_or_else(|| GatewayError::Store(format!("Unknown key '{}'", api_key)))?;
        record.daily_count += delta;
        Ok(())
    }

    async fn count_log_entries(&self, api_key: &str, since: DateTime<Utc>) -> Result<u64> {
        let log = self.log.read();
        let count = log
            .get(api_key)
            .map(|entries| entries.iter().filter(|t| **t >= since).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn append_log_entry(&self, api_key: &str, timestamp: DateTime<Utc>) -> Result<()> {
        let mut log = self.log.write();
        let entries = log.entry(api_key.to_string()).or_default();

        // Keep the per-minute count query bounded as volume grows
        let cutoff = timestamp - self.retention;
        while entries.front().is_some_and(|t| *t < cutoff) {
            entries.pop_front();
        }

        entries.push_back(timestamp);
        Ok(())
    }
}
