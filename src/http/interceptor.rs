//! Inbound request interceptor.
//!
//! Middleware at the request boundary: assigns the correlation ID, records
//! trace state, installs the outgoing-call decorator, and on completion
//! assembles the sanitized trace, hands it to the sink and purges the
//! store. Stages per request: START → RUNNING → TERMINATING → DONE.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use serde_json::{json, Map, Value};

use crate::config::TracerConfig;
use crate::http::client::TracedClient;
use crate::mask::MaskEngine;
use crate::observability::logging::{log_stage, Stage};
use crate::observability::metrics;
use crate::sink::TraceSink;
use crate::store::CorrelationStore;
use crate::trace::types::{
    format_duration, format_memory, format_size, now_unix_ms, peak_memory_bytes,
};
use crate::trace::{MetricsContext, RequestTracker, TraceLog, TraceRecord};

/// Correlation header read on entry and set on every traced response.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Longest accepted client-supplied correlation ID.
const MAX_REQUEST_ID_LEN: usize = 128;

const UNKNOWN_IP: &str = "UNKNOWN_IP";
const UNKNOWN_USER_AGENT: &str = "UNKNOWN_USER_AGENT";

/// The correlation ID assigned to the current request, readable by
/// handlers via request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Shared state for the interceptor middleware.
#[derive(Clone)]
pub struct TracerState {
    config: Arc<TracerConfig>,
    tracker: RequestTracker,
    mask: Arc<MaskEngine>,
    sink: Arc<dyn TraceSink>,
    client: reqwest::Client,
}

impl TracerState {
    /// Wire the tracer over a store and sink.
    ///
    /// Fails only when a configured mask pattern does not compile.
    pub fn new(
        config: TracerConfig,
        store: Arc<dyn CorrelationStore>,
        sink: Arc<dyn TraceSink>,
    ) -> Result<Self, regex::Error> {
        let mask = Arc::new(MaskEngine::from_config(&config)?);
        let tracker = RequestTracker::new(store, &config);
        Ok(Self {
            config: Arc::new(config),
            tracker,
            mask,
            sink,
            client: reqwest::Client::new(),
        })
    }

    /// The base outbound client, for callers running with tracking off.
    pub fn plain_client(&self) -> reqwest::Client {
        self.client.clone()
    }
}

/// The request interceptor middleware.
///
/// Wrap the application router with
/// `axum::middleware::from_fn_with_state(state, request_interceptor)`.
pub async fn request_interceptor(
    State(state): State<TracerState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // Config-gated passthrough.
    if !state.config.enabled {
        return next.run(req).await;
    }

    // START: resolve the correlation ID and record trace state.
    let request_id = resolve_request_id(&req);
    let started = Instant::now();
    let method = req.method().to_string();
    let url = req.uri().to_string();
    let client_ip = client_ip(&req);
    let user_agent = header_str(&req, "user-agent").unwrap_or_else(|| UNKNOWN_USER_AGENT.into());

    let record = TraceRecord {
        request_id: request_id.clone(),
        start_unix_ms: now_unix_ms(),
        method: method.clone(),
        path: req.uri().path().to_string(),
        client_ip: client_ip.clone(),
        user_agent: user_agent.clone(),
    };
    if let Err(e) = state.tracker.start_trace(&record).await {
        // Best-effort: the request proceeds untracked.
        tracing::debug!(error = %e, %request_id, "trace init failed");
    }

    let request_headers = state.mask.sanitize_headers(req.headers());
    log_stage(
        &request_id,
        Stage::Start,
        &json!({
            "method": method.clone(),
            "url": url.clone(),
            "ip": client_ip.clone(),
            "headers": request_headers.clone(),
        }),
    );

    // Buffer the request body so its input can appear in the trace, then
    // hand an equivalent request to the handler.
    let (mut req, request_input) = capture_input(req, &state.mask).await;

    req.extensions_mut().insert(RequestId(request_id.clone()));
    if state.config.track_outgoing_requests {
        let client = TracedClient::new(
            state.client.clone(),
            state.tracker.clone(),
            state.mask.clone(),
            request_id.clone(),
        );
        req.extensions_mut().insert(client);
    }

    // RUNNING: the handler executes; outgoing calls flow through the
    // installed decorator.
    let response = next.run(req).await;

    // TERMINATING: runs on success and error responses alike.
    let sanitized_request = json!({
        "method": method,
        "url": url,
        "headers": request_headers,
        "input": request_input,
    });
    let response = terminate(
        &state,
        &request_id,
        started,
        sanitized_request,
        &client_ip,
        &user_agent,
        response,
    )
    .await;

    // DONE: drop every store entry for this request rather than waiting
    // for TTL.
    if let Err(e) = state.tracker.purge(&request_id).await {
        tracing::debug!(error = %e, %request_id, "trace purge failed");
    }

    response
}

/// Assemble and emit the consolidated trace, then rebuild the response.
async fn terminate(
    state: &TracerState,
    request_id: &str,
    started: Instant,
    sanitized_request: Value,
    client_ip: &str,
    user_agent: &str,
    response: Response,
) -> Response {
    let (mut parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    let status = parts.status.as_u16();
    let content_type = parts
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let body_text = String::from_utf8_lossy(&bytes);
    let sanitized_body = state.mask.sanitize_body(
        content_type.as_deref(),
        &body_text,
        state.config.max_response_log_size,
    );

    let outgoing = match state.tracker.tracked_children(request_id).await {
        Ok(children) => children,
        Err(e) => {
            tracing::debug!(error = %e, %request_id, "child collection failed");
            Vec::new()
        }
    };

    let duration = started.elapsed();
    let context = MetricsContext {
        duration_ms: duration.as_millis() as u64,
        duration: format_duration(duration),
        response_size: format_size(bytes.len()),
        status_code: status,
        memory_peak: peak_memory_bytes().map(format_memory),
        client_ip: client_ip.to_string(),
        user_agent: user_agent.to_string(),
        outgoing_requests: outgoing,
    };

    log_stage(
        request_id,
        Stage::Complete,
        &json!({
            "duration": context.duration.clone(),
            "memory_peak": context.memory_peak.clone(),
            "response_size": context.response_size.clone(),
            "status": status,
            "outgoing_requests": context.outgoing_requests.len(),
            "ip": client_ip,
            "user_agent": user_agent,
        }),
    );
    metrics::record_trace_completed(status);

    let sanitized_response = json!({
        "status": status,
        "ip": client_ip,
        "user_agent": user_agent,
        "content_type": content_type,
        "body": sanitized_body,
    });

    // Fire-and-forget; the sink's fate never reaches the caller.
    state.sink.emit(TraceLog {
        request_id: request_id.to_string(),
        request: sanitized_request,
        response: sanitized_response,
        context,
    });

    if let Ok(value) = HeaderValue::from_str(request_id) {
        parts.headers.insert(X_REQUEST_ID, value);
    }
    Response::from_parts(parts, Body::from(bytes))
}

/// Use the propagated `X-Request-ID` when it is well-formed, else mint one.
///
/// Client-supplied IDs are trusted for correlation but bounded to printable
/// ASCII of sane length so they cannot poison store keys or log output.
fn resolve_request_id(req: &Request<Body>) -> String {
    req.headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(|id| id.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn header_str(req: &Request<Body>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Best-effort client address: X-Forwarded-For first hop, then socket peer.
fn client_ip(req: &Request<Body>) -> String {
    if let Some(forwarded) = header_str(req, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Capture query and body input for the trace, rebuilding the request.
///
/// Query pairs are collected first; a JSON object or form-encoded body
/// overlays them, matching "all input" semantics. Non-structured bodies are
/// left out of the input map.
async fn capture_input(req: Request<Body>, mask: &MaskEngine) -> (Request<Body>, Value) {
    let mut input: BTreeMap<String, Value> = BTreeMap::new();

    if let Some(query) = req.uri().query() {
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            input.insert(k.into_owned(), Value::String(v.into_owned()));
        }
    }

    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    if content_type.contains("application/json") {
        if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&bytes) {
            for (k, v) in map {
                input.insert(k, v);
            }
        }
    } else if content_type.contains("application/x-www-form-urlencoded") {
        for (k, v) in url::form_urlencoded::parse(&bytes) {
            input.insert(k.into_owned(), Value::String(v.into_owned()));
        }
    }

    let map: Map<String, Value> = input.into_iter().collect();
    let sanitized = mask.sanitize_map(&map);

    let req = Request::from_parts(parts, Body::from(bytes));
    (req, sanitized)
}
