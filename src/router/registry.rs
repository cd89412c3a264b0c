//! Provider Registry
//!
//! Static mapping from provider endpoints to the models they serve.
//! Built once from configuration, immutable thereafter. Selection among
//! compatible endpoints is uniform random; there is no weighting,
//! health-awareness, or sticky routing.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use rand::seq::SliceRandom;

/// One registered provider endpoint
#[derive(Debug, Clone)]
struct ProviderEntry {
    endpoint: String,
    models: Vec<String>,
}

/// Immutable endpoint -> models registry
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    /// Entries in configuration order; failover iterates this order
    entries: Vec<ProviderEntry>,
}

impl ProviderRegistry {
    /// Build the registry from loaded configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let entries = config
            .providers
            .iter()
            .map(|(endpoint, models)| ProviderEntry {
                endpoint: endpoint.clone(),
                models: models.clone(),
            })
            .collect();

        Self { entries }
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All endpoints serving `model`, in registry order.
    pub fn compatible(&self, model: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.models.iter().any(|m| m == model))
            .map(|entry| entry.endpoint.as_str())
            .collect()
    }

    /// Pick one endpoint serving `model`, uniformly at random among the
    /// compatible set.
    pub fn resolve(&self, model: &str) -> Result<&str> {
        self.compatible(model)
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or_else(|| GatewayError::ModelNotAvailable(model.to_string()))
    }
}
