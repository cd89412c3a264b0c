//! API surface types
//!
//! The public model catalog and the event-stream relay.

pub mod catalog;
pub mod relay;

pub use catalog::{ModelDescriptor, ModelList};
pub use relay::relay_events;
