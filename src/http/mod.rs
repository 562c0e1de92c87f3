//! HTTP boundary subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → interceptor.rs (START: resolve ID, record trace, install client)
//!     → handler (outgoing calls go through client.rs decorator)
//!     → interceptor.rs (TERMINATING: sanitize, emit, purge)
//!     → Response with X-Request-ID
//! ```

pub mod client;
pub mod interceptor;
pub mod server;

pub use client::TracedClient;
pub use interceptor::{request_interceptor, RequestId, TracerState, X_REQUEST_ID};
pub use server::{build_app, AppState};
