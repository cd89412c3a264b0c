//! HTTP Server
//!
//! The axum surface: landing page, model catalog, and the chat-completion
//! proxy entry point. Quota enforcement runs before any routing so a
//! denied request never reaches an upstream provider.

use crate::api::{ModelDescriptor, ModelList};
use crate::quota::QuotaEnforcer;
use crate::router::{RelayEngine, RelayOutcome};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

static LANDING_PAGE: &str = include_str!("../../public/index.html");

/// Shared state threaded through axum handlers
pub struct AppState {
    pub quota: QuotaEnforcer,
    pub engine: RelayEngine,
    pub catalog: Vec<ModelDescriptor>,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(ModelList::new(state.catalog.clone()))
}

/// Core entry point: enforce quota, route, relay.
async fn chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> crate::error::Result<Response> {
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let record = state.quota.enforce(presented).await?;
    info!(
        key = %record.api_key,
        daily_count = record.daily_count,
        "request admitted"
    );

    match state.engine.handle(body).await? {
        RelayOutcome::Buffered(bytes) => {
            Ok(([(CONTENT_TYPE, "application/json")], bytes).into_response())
        }
        RelayOutcome::Streamed(stream) => {
            let body = Body::from_stream(stream);
            Ok(([(CONTENT_TYPE, "text/event-stream")], body).into_response())
        }
    }
}
