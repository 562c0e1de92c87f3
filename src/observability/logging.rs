//! Structured logging and lifecycle stage entries.

use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;
use crate::trace::types::now_unix_ms;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate and tower_http.
pub fn init(config: &ObservabilityConfig) {
    let default_filter = format!(
        "request_tracer={level},tower_http={level}",
        level = config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Request lifecycle stages that produce log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "START",
            Stage::Complete => "COMPLETE",
        }
    }
}

/// Emit one structured stage entry for a request.
///
/// Best-effort: a failure inside the logging path degrades to a plain
/// stderr write and never propagates to the caller.
pub fn log_stage(request_id: &str, stage: Stage, context: &Value) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let entry = json!({
            "request_id": request_id,
            "stage": stage.as_str(),
            "timestamp_ms": now_unix_ms(),
            "context": context,
        });
        tracing::info!(
            target: "request_trace",
            %request_id,
            stage = stage.as_str(),
            entry = %entry,
            "request stage"
        );
    }));

    if result.is_err() {
        eprintln!("request {} - {request_id}: {context}", stage.as_str());
    }
}
