//! Routing & Failover Engine
//!
//! Drives one admitted request through provider selection, dispatch, and
//! failover. Buffered requests retry every remaining compatible endpoint
//! in registry order on a non-success response. Streaming requests fail
//! over the same way, but only until a byte stream has begun; after that
//! the first provider's stream is final.

use crate::api::relay_events;
use crate::client::HttpClient;
use crate::error::{GatewayError, Result};
use crate::router::ProviderRegistry;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a dispatched request
pub enum RelayOutcome {
    /// Full upstream body, ready to return as JSON
    Buffered(Bytes),

    /// Lazy event-stream relay from the chosen provider
    Streamed(BoxStream<'static, Result<Bytes>>),
}

/// Orchestrates validate -> choose -> dispatch -> failover
pub struct RelayEngine {
    registry: Arc<ProviderRegistry>,
    http: HttpClient,
}

impl RelayEngine {
    pub fn new(registry: Arc<ProviderRegistry>, http: HttpClient) -> Self {
        Self { registry, http }
    }

    /// Route one request body to a provider. The body is forwarded
    /// verbatim; only `model` and `stream` are inspected.
    pub async fn handle(&self, body: Value) -> Result<RelayOutcome> {
        let model = body
            .get("model")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::BadRequest("Model not specified in request".to_string()))?
            .to_string();

        let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);

        let first = self.registry.resolve(&model)?.to_string();
        debug!(%model, endpoint = %first, stream, "provider chosen");

        if stream {
            self.dispatch_streaming(&model, &first, &body).await
        } else {
            self.dispatch_buffered(&model, &first, &body).await
        }
    }

    /// Buffered dispatch: first 200 wins, sequentially over the chosen
    /// endpoint and then every other compatible endpoint.
    async fn dispatch_buffered(
        &self,
        model: &str,
        first: &str,
        body: &Value,
    ) -> Result<RelayOutcome> {
        match self.http.post_json(first, body).await {
            Ok((status, bytes)) if status == StatusCode::OK => {
                return Ok(RelayOutcome::Buffered(bytes))
            }
            Ok((status, _)) => {
                warn!(endpoint = %first, %status, "provider rejected request, failing over");
            }
            Err(e) => {
                warn!(endpoint = %first, error = %e, "provider unreachable, failing over");
            }
        }

        for endpoint in self.registry.compatible(model) {
            if endpoint == first {
                continue;
            }

            match self.http.post_json(endpoint, body).await {
                Ok((status, bytes)) if status == StatusCode::OK => {
                    return Ok(RelayOutcome::Buffered(bytes))
                }
                Ok((status, _)) => {
                    warn!(%endpoint, %status, "provider rejected request");
                }
                Err(e) => {
                    warn!(%endpoint, error = %e, "provider unreachable");
                }
            }
        }

        Err(GatewayError::ProvidersExhausted)
    }

    /// Streaming dispatch: failover applies only to the initial
    /// connection attempt. Once a 200 stream is open, its bytes are
    /// relayed as-is and mid-stream failures surface inside the stream.
    async fn dispatch_streaming(
        &self,
        model: &str,
        first: &str,
        body: &Value,
    ) -> Result<RelayOutcome> {
        let mut candidates = vec![first.to_string()];
        candidates.extend(
            self.registry
                .compatible(model)
                .into_iter()
                .filter(|endpoint| *endpoint != first)
                .map(String::from),
        );

        let mut last_failure = None;

        for endpoint in &candidates {
            match self.http.post_stream(endpoint, body).await {
                Ok(response) if response.status() == StatusCode::OK => {
                    let upstream = response.bytes_stream();
                    return Ok(RelayOutcome::Streamed(Box::pin(relay_events(upstream))));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let detail = response.text().await.unwrap_or_default();
                    warn!(%endpoint, status, "stream connect rejected");
                    last_failure = Some(GatewayError::Upstream {
                        status,
                        body: detail,
                    });
                }
                Err(e) => {
                    warn!(%endpoint, error = %e, "stream connect failed");
                    last_failure = Some(e);
                }
            }
        }

        Err(last_failure.unwrap_or(GatewayError::ProvidersExhausted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use futures::StreamExt;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn engine_for(endpoints: &[(&str, &[&str])]) -> RelayEngine {
        let providers: BTreeMap<String, Vec<String>> = endpoints
            .iter()
            .map(|(endpoint, models)| {
                (
                    endpoint.to_string(),
                    models.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect();

        let registry = ProviderRegistry::from_config(&GatewayConfig {
            providers,
            ..GatewayConfig::default()
        });

        let http = HttpClient::new(Duration::from_secs(5), Duration::from_secs(5)).unwrap();
        RelayEngine::new(Arc::new(registry), http)
    }

    #[tokio::test]
    async fn test_missing_model_is_bad_request() {
        let engine = engine_for(&[]);
        let result = engine.handle(json!({"messages": []})).await;
        assert!(matches!(result, Err(GatewayError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_unknown_model_not_available() {
        let engine = engine_for(&[("https://a.example", &["gpt-4"])]);
        let result = engine.handle(json!({"model": "claude-3"})).await;
        assert!(matches!(result, Err(GatewayError::ModelNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_buffered_single_provider_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/only")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let endpoint = format!("{}/only", server.url());
        let engine = engine_for(&[(endpoint.as_str(), &["gpt-4"])]);

        let outcome = engine.handle(json!({"model": "gpt-4"})).await.unwrap();
        match outcome {
            RelayOutcome::Buffered(bytes) => assert_eq!(&bytes[..], br#"{"choices":[]}"#),
            RelayOutcome::Streamed(_) => panic!("expected buffered outcome"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_buffered_failover_third_provider_wins() {
        let mut server = mockito::Server::new_async().await;
        let a = server
            .mock("POST", "/a")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let b = server
            .mock("POST", "/b")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let c = server
            .mock("POST", "/c")
            .with_status(200)
            .with_body(r#"{"from":"c"}"#)
            .expect(1)
            .create_async()
            .await;

        let url_a = format!("{}/a", server.url());
        let url_b = format!("{}/b", server.url());
        let url_c = format!("{}/c", server.url());
        let engine = engine_for(&[
            (url_a.as_str(), &["gpt-4"]),
            (url_b.as_str(), &["gpt-4"]),
            (url_c.as_str(), &["gpt-4"]),
        ]);

        // Pin the initial pick to /a so the call sequence is a, b, c
        let body = json!({"model": "gpt-4"});
        let outcome = engine
            .dispatch_buffered("gpt-4", &url_a, &body)
            .await
            .unwrap();

        match outcome {
            RelayOutcome::Buffered(bytes) => assert_eq!(&bytes[..], br#"{"from":"c"}"#),
            RelayOutcome::Streamed(_) => panic!("expected buffered outcome"),
        }
        a.assert_async().await;
        b.assert_async().await;
        c.assert_async().await;
    }

    #[tokio::test]
    async fn test_buffered_exhaustion_counts_calls() {
        let mut server = mockito::Server::new_async().await;
        let a = server
            .mock("POST", "/a")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let b = server
            .mock("POST", "/b")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let url_a = format!("{}/a", server.url());
        let url_b = format!("{}/b", server.url());
        let engine = engine_for(&[(url_a.as_str(), &["gpt-4"]), (url_b.as_str(), &["gpt-4"])]);

        let body = json!({"model": "gpt-4"});
        let result = engine.dispatch_buffered("gpt-4", &url_a, &body).await;
        assert!(matches!(result, Err(GatewayError::ProvidersExhausted)));

        // Exactly one call per compatible endpoint, no repeats
        a.assert_async().await;
        b.assert_async().await;
    }

    #[tokio::test]
    async fn test_buffered_first_endpoint_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let a = server
            .mock("POST", "/a")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let url_a = format!("{}/a", server.url());
        let engine = engine_for(&[(url_a.as_str(), &["gpt-4"])]);

        let body = json!({"model": "gpt-4"});
        let result = engine.dispatch_buffered("gpt-4", &url_a, &body).await;
        assert!(matches!(result, Err(GatewayError::ProvidersExhausted)));
        a.assert_async().await;
    }

    #[tokio::test]
    async fn test_streaming_relay() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stream")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: {\"delta\":\"a\"}\n\ndata: {\"delta\":\"b\"}\ndata: [DONE]\n")
            .expect(1)
            .create_async()
            .await;

        let endpoint = format!("{}/stream", server.url());
        let engine = engine_for(&[(endpoint.as_str(), &["gpt-4"])]);

        let outcome = engine
            .handle(json!({"model": "gpt-4", "stream": true}))
            .await
            .unwrap();

        let mut stream = match outcome {
            RelayOutcome::Streamed(stream) => stream,
            RelayOutcome::Buffered(_) => panic!("expected streamed outcome"),
        };

        let mut frames = Vec::new();
        while let Some(item) = stream.next().await {
            frames.push(String::from_utf8(item.unwrap().to_vec()).unwrap());
        }

        assert_eq!(
            frames,
            vec![
                "data: {\"delta\":\"a\"}\n\n",
                "data: {\"delta\":\"b\"}\n\n",
                "data: [DONE]\n\n",
            ]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_streaming_fails_over_before_first_byte() {
        let mut server = mockito::Server::new_async().await;
        let a = server
            .mock("POST", "/a")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;
        let b = server
            .mock("POST", "/b")
            .with_status(200)
            .with_body("data: ok\n")
            .expect(1)
            .create_async()
            .await;

        let url_a = format!("{}/a", server.url());
        let url_b = format!("{}/b", server.url());
        let engine = engine_for(&[(url_a.as_str(), &["gpt-4"]), (url_b.as_str(), &["gpt-4"])]);

        let body = json!({"model": "gpt-4", "stream": true});
        let outcome = engine
            .dispatch_streaming("gpt-4", &url_a, &body)
            .await
            .unwrap();

        let mut stream = match outcome {
            RelayOutcome::Streamed(stream) => stream,
            RelayOutcome::Buffered(_) => panic!("expected streamed outcome"),
        };
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"data: ok\n\n");

        a.assert_async().await;
        b.assert_async().await;
    }

    #[tokio::test]
    async fn test_streaming_single_provider_failure_passes_status_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/a")
            .with_status(503)
            .with_body("overloaded")
            .expect(1)
            .create_async()
            .await;

        let endpoint = format!("{}/a", server.url());
        let engine = engine_for(&[(endpoint.as_str(), &["gpt-4"])]);

        let body = json!({"model": "gpt-4", "stream": true});
        let result = engine.dispatch_streaming("gpt-4", &endpoint, &body).await;

        match result {
            Err(GatewayError::Upstream { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected upstream error, got {:?}", other.map(|_| ())),
        }
        mock.assert_async().await;
    }
}
