//! Quota Enforcer
//!
//! Decides allow/deny for a presented API key and records the attempt.
//! Checks run in a fixed order: key lookup, daily reset, per-minute
//! window, per-day count. The log append and count increment happen only
//! on allow; a denied request leaves the store untouched.

use crate::config::{GatewayConfig, TierLimits};
use crate::error::{GatewayError, LimitDimension, Result};
use crate::store::{KeyRecord, KeyStore, KeyTier};
use chrono::{DateTime, Duration, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Admission control for presented API keys
pub struct QuotaEnforcer {
    store: Arc<dyn KeyStore>,

    /// Wall-clock time-of-day at which daily counts reset
    anchor: NaiveTime,

    /// Timezone the anchor is interpreted in
    zone: Tz,

    basic_limits: TierLimits,
    pro_limits: TierLimits,

    /// Per-key locks serializing the read-check-write sequence, so
    /// concurrent requests on one key cannot both pass a limit check
    /// before either records its attempt.
    locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl QuotaEnforcer {
    /// Build an enforcer from configuration. Fails on an unknown timezone
    /// identifier or an out-of-range reset hour.
    pub fn new(store: Arc<dyn KeyStore>, config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            store,
            anchor: config.quota.anchor_time()?,
            zone: config.quota.timezone()?,
            basic_limits: config.limits_for(KeyTier::Basic),
            pro_limits: config.limits_for(KeyTier::Pro),
            locks: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    fn limits(&self, tier: KeyTier) -> TierLimits {
        match tier {
            KeyTier::Basic => self.basic_limits,
            KeyTier::Pro => self.pro_limits,
        }
    }

    fn lock_for(&self, api_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(api_key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// The most recent reset instant at or before `now`.
    pub fn reset_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.zone);
        let mut date = local.date_naive();
        if local.time() < self.anchor {
            date = date.pred_opt().unwrap_or(date);
        }

        let naive = date.and_time(self.anchor);
        let boundary = match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(t) => t,
            // DST fold: take the earlier of the two occurrences
            LocalResult::Ambiguous(earliest, _) => earliest,
            // Anchor falls in a skipped hour
            LocalResult::None => self.zone.from_utc_datetime(&naive),
        };

        boundary.with_timezone(&Utc)
    }

    /// Validate a presented `Authorization` value against the key store
    /// and its quota. Returns the key record as of admission.
    pub async fn enforce(&self, presented: Option<&str>) -> Result<KeyRecord> {
        self.enforce_at(presented, Utc::now()).await
    }

    /// [`enforce`](Self::enforce) with an explicit clock.
    pub async fn enforce_at(
        &self,
        presented: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<KeyRecord> {
        let raw = presented.ok_or(GatewayError::Unauthorized)?;
        let api_key = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if api_key.is_empty() {
            return Err(GatewayError::Unauthorized);
        }

        // Unknown keys are rejected with a plain read before any lock
        // slot is allocated, so spraying bogus bearer tokens cannot grow
        // the lock map.
        if self.store.find_by_key(api_key).await?.is_none() {
            return Err(GatewayError::Unauthorized);
        }

        let lock = self.lock_for(api_key);
        let _guard = lock.lock().await;

        // Re-read under the lock: another admitted request may have
        // advanced the record between the existence check and here.
        let mut record = self
            .store
            .find_by_key(api_key)
            .await?
            .ok_or(GatewayError::Unauthorized)?;

        // Apply a pending daily reset before evaluating limits, so a key
        // crossing the boundary is judged against a fresh quota in the
        // same request.
        let boundary = self.reset_boundary(now);
        if record.last_reset < boundary {
            self.store
                .update_reset_and_count(api_key, 0, boundary)
                .await?;
            record.daily_count = 0;
            record.last_reset = boundary;
            info!(key = %api_key, %boundary, "daily quota reset");
        }

        let limits = self.limits(record.key_type);

        let minute_count = self
            .store
            .count_log_entries(api_key, now - Duration::seconds(60))
            .await?;
        if minute_count >= limits.per_minute {
            debug!(key = %api_key, minute_count, "per-minute limit hit");
            return Err(GatewayError::RateLimited(LimitDimension::Minute));
        }

        if record.daily_count >= limits.per_day {
            debug!(key = %api_key, daily_count = record.daily_count, "per-day limit hit");
            return Err(GatewayError::RateLimited(LimitDimension::Day));
        }

        // These two writes are what makes the request count; they happen
        // only on allow.
        self.store.append_log_entry(api_key, now).await?;
        self.store.increment_count(api_key, 1).await?;
        record.daily_count += 1;

        Ok(record)
    }
}
