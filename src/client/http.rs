//! HTTP Client
//!
//! Thin async wrapper around reqwest for provider dispatch. Buffered
//! calls carry a total per-request deadline; streaming calls only the
//! connect timeout, since a relay may stay open indefinitely.

use crate::error::{GatewayError, Result};
use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// HTTP client for upstream provider calls
pub struct HttpClient {
    client: Client,

    /// Deadline applied to buffered requests
    request_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// POST a JSON body and buffer the full response.
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<(StatusCode, Bytes)> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        Ok((status, bytes))
    }

    /// POST a JSON body and hand back the open response for streaming.
    /// No overall deadline; only the connect timeout applies.
    pub async fn post_stream(&self, url: &str, body: &Value) -> Result<Response> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(body)
            .send()
            .await?;

        Ok(response)
    }
}
