//! Gateway Configuration
//!
//! Defines the configuration schema for the gateway: listen address,
//! provider registry data, rate-limit tiers, quota reset anchor, and the
//! public model catalog.

use crate::api::ModelDescriptor;
use crate::error::{GatewayError, Result};
use crate::store::KeyTier;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Provider endpoint URL -> model identifiers it serves.
    ///
    /// Ordered map so failover iterates endpoints deterministically.
    #[serde(default)]
    pub providers: BTreeMap<String, Vec<String>>,

    /// Rate-limit tier table keyed by key tier
    #[serde(default = "default_tiers")]
    pub tiers: HashMap<KeyTier, TierLimits>,

    /// Daily quota reset settings
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Static model catalog served at /v1/models
    #[serde(default)]
    pub catalog: Vec<ModelDescriptor>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            providers: BTreeMap::new(),
            tiers: default_tiers(),
            quota: QuotaConfig::default(),
            catalog: Vec::new(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the listener to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Total timeout for buffered upstream calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connect timeout for all upstream calls, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Per-tier request limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierLimits {
    /// Maximum requests in any trailing 60-second window
    pub per_minute: u64,

    /// Maximum requests per day (between resets)
    pub per_day: u64,
}

/// Daily quota reset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Wall-clock hour-of-day at which daily counts reset
    #[serde(default = "default_reset_hour")]
    pub reset_hour: u32,

    /// IANA timezone identifier the reset hour is anchored in
    #[serde(default = "default_reset_timezone")]
    pub reset_timezone: String,

    /// How long request-log entries are retained, in seconds.
    /// Must cover the 60-second counting window.
    #[serde(default = "default_log_retention")]
    pub log_retention_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            reset_hour: default_reset_hour(),
            reset_timezone: default_reset_timezone(),
            log_retention_secs: default_log_retention(),
        }
    }
}

impl QuotaConfig {
    /// Parse the configured timezone identifier.
    pub fn timezone(&self) -> Result<Tz> {
        self.reset_timezone.parse::<Tz>().map_err(|_| {
            GatewayError::Config(format!("Unknown timezone '{}'", self.reset_timezone))
        })
    }

    /// The reset anchor as a wall-clock time-of-day.
    pub fn anchor_time(&self) -> Result<NaiveTime> {
        NaiveTime::from_hms_opt(self.reset_hour, 0, 0).ok_or_else(|| {
            GatewayError::Config(format!("Invalid reset hour {}", self.reset_hour))
        })
    }
}

impl GatewayConfig {
    /// Look up the limits for a tier. Falls back to the built-in table for
    /// tiers missing from configuration.
    pub fn limits_for(&self, tier: KeyTier) -> TierLimits {
        self.tiers
            .get(&tier)
            .copied()
            .unwrap_or_else(|| builtin_limits(tier))
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_reset_hour() -> u32 {
    13
}

fn default_reset_timezone() -> String {
    "US/Eastern".to_string()
}

fn default_log_retention() -> u64 {
    120
}

fn builtin_limits(tier: KeyTier) -> TierLimits {
    match tier {
        KeyTier::Basic => TierLimits {
            per_minute: 15,
            per_day: 1000,
        },
        KeyTier::Pro => TierLimits {
            per_minute: 60,
            per_day: 5000,
        },
    }
}

fn default_tiers() -> HashMap<KeyTier, TierLimits> {
    [
        (KeyTier::Basic, builtin_limits(KeyTier::Basic)),
        (KeyTier::Pro, builtin_limits(KeyTier::Pro)),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let config: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.quota.reset_hour, 13);
        assert_eq!(config.quota.reset_timezone, "US/Eastern");
        assert_eq!(
            config.limits_for(KeyTier::Basic),
            TierLimits {
                per_minute: 15,
                per_day: 1000
            }
        );
        assert_eq!(
            config.limits_for(KeyTier::Pro),
            TierLimits {
                per_minute: 60,
                per_day: 5000
            }
        );
    }

    #[test]
    fn test_deserialize_providers() {
        let json = r#"{
            "providers": {
                "https://b.example/v1/chat/completions": ["gpt-4"],
                "https://a.example/v1/chat/completions": ["gpt-4", "gpt-3.5-turbo"]
            },
            "tiers": {
                "basic": { "per_minute": 5, "per_day": 100 }
            }
        }"#;

        let config: GatewayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.providers.len(), 2);
        // BTreeMap keeps endpoints in lexical order
        let endpoints: Vec<_> = config.providers.keys().collect();
        assert!(endpoints[0] < endpoints[1]);
        assert_eq!(config.limits_for(KeyTier::Basic).per_minute, 5);
        // Unconfigured tiers fall back to built-ins
        assert_eq!(config.limits_for(KeyTier::Pro).per_day, 5000);
    }

    #[test]
    fn test_quota_validation() {
        let quota = QuotaConfig::default();
        assert!(quota.timezone().is_ok());
        assert!(quota.anchor_time().is_ok());

        let bad_hour = QuotaConfig {
            reset_hour: 24,
            ..QuotaConfig::default()
        };
        assert!(bad_hour.anchor_time().is_err());

        let bad_tz = QuotaConfig {
            reset_timezone: "Mars/Olympus".to_string(),
            ..QuotaConfig::default()
        };
        assert!(bad_tz.timezone().is_err());
    }
}
