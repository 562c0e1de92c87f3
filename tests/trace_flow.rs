//! End-to-end correlation tests: inbound requests through the interceptor,
//! outgoing calls through the traced client, traces into a capturing sink.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use request_tracer::config::TracerConfig;
use request_tracer::http::{request_interceptor, TracedClient, TracerState};
use request_tracer::sink::TraceSink;
use request_tracer::store::{keys, CorrelationStore, MemoryStore};
use request_tracer::trace::ChildOutcome;

mod common;
use common::CaptureSink;

struct TestApp {
    addr: SocketAddr,
    sink: Arc<CaptureSink>,
    store: Arc<MemoryStore>,
}

/// Spin up a router with the interceptor installed and the given handler
/// on `/run`, bound to an ephemeral port.
async fn start_app<H, T>(config: TracerConfig, handler: H) -> TestApp
where
    H: axum::handler::Handler<T, ()>,
    T: 'static,
{
    let sink = CaptureSink::new();
    let store = Arc::new(MemoryStore::new());
    let tracer = TracerState::new(
        config,
        store.clone() as Arc<dyn CorrelationStore>,
        sink.clone() as Arc<dyn TraceSink>,
    )
    .unwrap();

    let app = Router::new()
        .route("/run", get(handler))
        .layer(middleware::from_fn_with_state(tracer, request_interceptor));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { addr, sink, store }
}

fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

async fn ok_handler() -> &'static str {
    "done"
}

/// Handler issuing two upstream calls through the traced client. The
/// upstream base address arrives in the `x-upstream` header.
async fn fan_out_handler(req: Request<Body>) -> Response {
    let upstream = req
        .headers()
        .get("x-upstream")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let Some(client) = req.extensions().get::<TracedClient>().cloned() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "no traced client").into_response();
    };

    let first = client.get(format!("http://{upstream}/a")).await;
    let second = client.get(format!("http://{upstream}/b")).await;
    match (first, second) {
        (Ok(_), Ok(_)) => "both done".into_response(),
        _ => (StatusCode::BAD_GATEWAY, "upstream failed").into_response(),
    }
}

/// Handler whose single outgoing call fails (connection refused).
async fn failing_call_handler(req: Request<Body>) -> Response {
    let Some(client) = req.extensions().get::<TracedClient>().cloned() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "no traced client").into_response();
    };
    match client.get("http://127.0.0.1:9/unreachable").await {
        Ok(_) => "unexpected success".into_response(),
        Err(_) => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
    }
}

#[tokio::test]
async fn supplied_request_id_is_echoed() {
    let app = start_app(TracerConfig::default(), ok_handler).await;

    let res = test_client()
        .get(format!("http://{}/run", app.addr))
        .header("x-request-id", "abc")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-request-id"], "abc");
    let logs = app.sink.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].request_id, "abc");
}

#[tokio::test]
async fn missing_request_id_generates_unique_value() {
    let app = start_app(TracerConfig::default(), ok_handler).await;
    let client = test_client();

    let first = client
        .get(format!("http://{}/run", app.addr))
        .send()
        .await
        .unwrap();
    let second = client
        .get(format!("http://{}/run", app.addr))
        .send()
        .await
        .unwrap();

    let id1 = first.headers()["x-request-id"].to_str().unwrap().to_string();
    let id2 = second.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&id1).is_ok());
    assert_ne!(id1, id2);
}

#[tokio::test]
async fn two_outgoing_calls_traced_in_dispatch_order() {
    let upstream = common::start_mock_upstream("application/json", r#"{"ok":true}"#).await;
    let app = start_app(TracerConfig::default(), fan_out_handler).await;

    let res = test_client()
        .get(format!("http://{}/run", app.addr))
        .header("x-request-id", "abc")
        .header("x-upstream", upstream.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let logs = app.sink.logs();
    assert_eq!(logs.len(), 1);
    #[cfg(target_os = "linux")]
    assert!(logs[0]
        .context
        .memory_peak
        .as_deref()
        .is_some_and(|m| m.ends_with(" MB")));
    let children = &logs[0].context.outgoing_requests;
    assert_eq!(children.len(), 2);
    assert!(children[0].uri.ends_with("/a"));
    assert!(children[1].uri.ends_with("/b"));
    for child in children {
        assert_eq!(child.main_request_id, "abc");
        assert!(child.child_call_id.starts_with("abc_"));
        assert!(child.duration_ms.is_some());
        match &child.outcome {
            Some(ChildOutcome::Success {
                status_code,
                truncated_body,
                ..
            }) => {
                assert_eq!(*status_code, 200);
                assert_eq!(truncated_body, r#"{"ok":true}"#);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

#[tokio::test]
async fn store_is_purged_after_completion() {
    let upstream = common::start_mock_upstream("application/json", r#"{"ok":true}"#).await;
    let app = start_app(TracerConfig::default(), fan_out_handler).await;

    test_client()
        .get(format!("http://{}/run", app.addr))
        .header("x-request-id", "purge-me")
        .header("x-upstream", upstream.to_string())
        .send()
        .await
        .unwrap();

    let logs = app.sink.logs();
    assert_eq!(logs[0].context.outgoing_requests.len(), 2);

    assert!(app.store.get(&keys::trace("purge-me")).await.unwrap().is_none());
    assert!(app
        .store
        .get(&keys::outgoing_list("purge-me"))
        .await
        .unwrap()
        .is_none());
    for child in &logs[0].context.outgoing_requests {
        assert!(app
            .store
            .get(&keys::outgoing(&child.child_call_id))
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn failed_outgoing_call_recorded_and_propagated() {
    let app = start_app(TracerConfig::default(), failing_call_handler).await;

    let res = test_client()
        .get(format!("http://{}/run", app.addr))
        .send()
        .await
        .unwrap();
    // The handler saw the error unchanged and chose its own response.
    assert_eq!(res.status(), 502);

    let logs = app.sink.logs();
    let children = &logs[0].context.outgoing_requests;
    assert_eq!(children.len(), 1);
    match &children[0].outcome {
        Some(ChildOutcome::Failure {
            error_message,
            error_code,
        }) => {
            assert!(!error_message.is_empty());
            // Connection refused carries no HTTP status; recorded as 500.
            assert_eq!(*error_code, 500);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn sensitive_input_masked_in_trace() {
    let app = start_app(TracerConfig::default(), ok_handler).await;

    test_client()
        .get(format!(
            "http://{}/run?password=hunter2&note=call%209876543210",
            app.addr
        ))
        .header("x-request-id", "mask-me")
        .send()
        .await
        .unwrap();

    let logs = app.sink.logs();
    let input = &logs[0].request["input"];
    assert_eq!(input["password"], "***REDACTED_FIELD_password***");
    assert_eq!(input["note"], "call 987****210");
}

#[tokio::test]
async fn sensitive_headers_redacted_in_trace() {
    let app = start_app(TracerConfig::default(), ok_handler).await;

    test_client()
        .get(format!("http://{}/run", app.addr))
        .header("authorization", "Bearer secret-token")
        .send()
        .await
        .unwrap();

    let logs = app.sink.logs();
    let headers = &logs[0].request["headers"];
    assert_eq!(
        headers["authorization"],
        "***REDACTED_HEADER_authorization***"
    );
}

#[tokio::test]
async fn disabled_tracer_is_passthrough() {
    let config = TracerConfig {
        enabled: false,
        ..TracerConfig::default()
    };
    let app = start_app(config, ok_handler).await;

    let res = test_client()
        .get(format!("http://{}/run", app.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().get("x-request-id").is_none());
    assert!(app.sink.logs().is_empty());
}

#[tokio::test]
async fn tracking_disabled_still_sets_request_id() {
    let config = TracerConfig {
        track_outgoing_requests: false,
        ..TracerConfig::default()
    };
    let app = start_app(config, ok_handler).await;

    let res = test_client()
        .get(format!("http://{}/run", app.addr))
        .header("x-request-id", "no-children")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-request-id"], "no-children");
    let logs = app.sink.logs();
    assert!(logs[0].context.outgoing_requests.is_empty());
}
