//! Demo application wiring for the tracer.
//!
//! # Responsibilities
//! - Build the Axum router with the interceptor installed
//! - Expose a relay handler that exercises the traced outbound client
//! - Health endpoint for probes

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::client::TracedClient;
use crate::http::interceptor::{request_interceptor, RequestId, TracerState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracer: TracerState,
}

/// Build the demo router with the tracer layer installed.
pub fn build_app(config: &AppConfig, tracer: TracerState) -> Router {
    let state = AppState {
        tracer: tracer.clone(),
    };

    Router::new()
        .route("/healthz", get(health))
        .route("/relay", get(relay))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.listener.request_timeout_secs,
                )))
                .layer(middleware::from_fn_with_state(tracer, request_interceptor)),
        )
}

async fn health() -> &'static str {
    "ok"
}

/// Fetch an upstream URL on behalf of the caller.
///
/// Goes through the request-scoped [`TracedClient`] when the interceptor
/// installed one, so the outgoing call lands in the trace; falls back to
/// the plain client when tracking is off.
async fn relay(State(state): State<AppState>, req: Request<Body>) -> Response {
    let query: HashMap<String, String> = req
        .uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let Some(target) = query.get("url") else {
        return (StatusCode::BAD_REQUEST, "missing url parameter").into_response();
    };

    if let Some(RequestId(id)) = req.extensions().get::<RequestId>() {
        tracing::debug!(request_id = %id, target = %target, "relaying upstream call");
    }

    let result = match req.extensions().get::<TracedClient>() {
        Some(client) => client.get(target).await,
        None => state.tracer.plain_client().get(target).send().await,
    };

    match result {
        Ok(upstream) => {
            let status = StatusCode::from_u16(upstream.status().as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let body = upstream.text().await.unwrap_or_default();
            (status, body).into_response()
        }
        Err(e) => (StatusCode::BAD_GATEWAY, format!("upstream error: {e}")).into_response(),
    }
}
