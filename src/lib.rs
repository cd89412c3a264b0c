//! modelgate - Multi-Provider Chat-Completion Gateway
//!
//! An API gateway that fronts interchangeable upstream chat-completion
//! providers, enforcing per-key quotas and transparently failing over
//! between providers when one rejects a request.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod quota;
pub mod router;
pub mod server;
pub mod store;

pub use client::HttpClient;
pub use config::{ConfigLoader, GatewayConfig};
pub use error::{GatewayError, Result};
pub use quota::QuotaEnforcer;
pub use router::{ProviderRegistry, RelayEngine};
pub use server::AppState;
pub use store::{KeyStore, MemoryStore};
