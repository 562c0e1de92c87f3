//! Request correlation subsystem.
//!
//! # Data Flow
//! ```text
//! http/interceptor.rs (inbound boundary)
//!     → tracker.rs start_trace / tracked_children / purge
//! http/client.rs (outgoing decorator)
//!     → tracker.rs track_dispatch / finalize
//! both
//!     → store/ (TTL key/value medium)
//! ```
//!
//! # Design Decisions
//! - Records cross the store as JSON; malformed stored records are treated
//!   as absent (tracking-infrastructure error class)
//! - Every tracker operation returns a Result the orchestrator may discard;
//!   tracing failures never affect the main response

pub mod tracker;
pub mod types;

pub use tracker::RequestTracker;
pub use types::{ChildCallRecord, ChildOutcome, MetricsContext, TraceLog, TraceRecord};
