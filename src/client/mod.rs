//! HTTP client module
//!
//! Outbound transport to upstream providers.

pub mod http;

pub use http::HttpClient;
