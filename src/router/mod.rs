//! Request Routing
//!
//! Provider resolution and the dispatch/failover engine.

pub mod engine;
pub mod registry;

pub use engine::{RelayEngine, RelayOutcome};
pub use registry::ProviderRegistry;
