//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, lifecycle stage entries)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; request ID on every stage entry
//! - Stage logging is best-effort with a stderr fallback
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
