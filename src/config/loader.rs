//! Configuration Loader
//!
//! Handles loading and merging gateway configuration from multiple sources.

use crate::api::ModelDescriptor;
use crate::config::settings::{GatewayConfig, QuotaConfig, ServerConfig, TierLimits};
use crate::error::{GatewayError, Result};
use crate::store::KeyTier;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// One configuration source as written. Scalar sections stay `None`
/// when the source does not mention them, so merging cannot revert an
/// earlier source's settings to defaults.
#[derive(Debug, Deserialize)]
struct ConfigOverlay {
    server: Option<ServerConfig>,

    #[serde(default)]
    providers: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    tiers: HashMap<KeyTier, TierLimits>,

    quota: Option<QuotaConfig>,

    #[serde(default)]
    catalog: Vec<ModelDescriptor>,
}

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: GatewayConfig,
}

impl ConfigLoader {
    /// Create a new config loader and load from default locations
    pub fn new() -> Result<Self> {
        let mut loader = Self {
            config: GatewayConfig::default(),
        };

        // Load built-in defaults first
        loader.load_builtin_defaults()?;

        // Then load from file system (can override built-ins)
        loader.load_from_default_paths()?;

        Ok(loader)
    }

    /// Create a loader with a specific config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self {
            config: GatewayConfig::default(),
        };

        loader.load_builtin_defaults()?;
        loader.load_from_file(path)?;

        Ok(loader)
    }

    /// Load built-in defaults
    fn load_builtin_defaults(&mut self) -> Result<()> {
        let defaults = include_str!("../../gateway.json");
        let overlay: ConfigOverlay = serde_json::from_str(defaults).map_err(|e| {
            GatewayError::Config(format!("Failed to parse built-in gateway.json: {}", e))
        })?;

        self.merge_config(overlay);
        Ok(())
    }

    /// Load configuration from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        let paths = Self::get_config_paths();

        for path in paths {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }

        Ok(())
    }

    /// Get list of config paths to check
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Environment variable
        if let Ok(custom_path) = std::env::var("MODELGATE_CONFIG_PATH") {
            paths.push(PathBuf::from(custom_path));
        }

        // 2. Current directory
        paths.push(PathBuf::from("gateway.json"));
        paths.push(PathBuf::from("modelgate.json"));

        // 3. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("modelgate").join("gateway.json"));
        }

        // 4. Home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".modelgate").join("gateway.json"));
        }

        paths
    }

    /// Load configuration from a specific file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let overlay: ConfigOverlay = serde_json::from_str(&content).map_err(|e| {
            GatewayError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        self.merge_config(overlay);
        Ok(())
    }

    /// Merge another source into this one (later sources override
    /// earlier, but only for the sections they actually specify)
    fn merge_config(&mut self, other: ConfigOverlay) {
        for (endpoint, models) in other.providers {
            self.config.providers.insert(endpoint, models);
        }

        for (tier, limits) in other.tiers {
            self.config.tiers.insert(tier, limits);
        }

        if !other.catalog.is_empty() {
            self.config.catalog = other.catalog;
        }

        if let Some(server) = other.server {
            self.config.server = server;
        }

        if let Some(quota) = other.quota {
            self.config.quota = quota;
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> GatewayConfig {
        self.config
    }
}
