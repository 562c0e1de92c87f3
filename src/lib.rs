//! Request correlation and sanitization layer for Axum backends.
//!
//! # Architecture Overview
//!
//! ```text
//! Inbound request
//!     → http/interceptor.rs   assign X-Request-ID, record trace state
//!     → handler               outgoing calls via http/client.rs decorator
//!           → store/          TTL-bounded correlation records
//!     → http/interceptor.rs   collect children, sanitize via mask/,
//!                             emit to sink/, purge store entries
//!     → Response (X-Request-ID set)
//! ```
//!
//! Cross-cutting: config/ (TOML schema + validation), observability/
//! (structured logs, metrics), lifecycle/ (shutdown coordination).

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mask;
pub mod observability;
pub mod sink;
pub mod store;
pub mod trace;

pub use config::{AppConfig, TracerConfig};
pub use http::{build_app, request_interceptor, RequestId, TracedClient, TracerState};
pub use lifecycle::Shutdown;
pub use mask::MaskEngine;
pub use sink::{ChannelSink, LogSink, TraceSink};
pub use store::{CorrelationStore, MemoryStore};
pub use trace::{RequestTracker, TraceLog};
