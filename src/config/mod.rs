//! Configuration module
//!
//! Gateway configuration types and multi-source loading.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{GatewayConfig, QuotaConfig, ServerConfig, TierLimits};
