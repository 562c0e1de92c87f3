//! Correlation storage subsystem.
//!
//! # Data Flow
//! ```text
//! trace/ tracker operations
//!     → CorrelationStore trait (put/get/delete with TTL)
//!     → memory.rs (DashMap backend with per-entry deadlines)
//! ```
//!
//! Three key spaces share one store:
//! - `trace:<requestId>`         — per-request trace state
//! - `outgoing:<childCallId>`    — one record per outgoing call
//! - `outgoing_list:<requestId>` — dispatch-ordered child ID list
//!
//! # Design Decisions
//! - Reads of an absent key return `None`, never an error; callers treat
//!   absence as "expired or never existed"
//! - Values are `serde_json::Value` so any expiring backend that can hold a
//!   JSON blob can implement the trait
//! - Last-write-wins per key; no transactions. The child-list append is
//!   read-modify-write and may lose entries under concurrent appends, which
//!   is acceptable for best-effort trace data

pub mod memory;

pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Errors from the storage backend.
///
/// Call sites treat these as tracking-infrastructure failures and degrade
/// rather than propagate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

/// A TTL-bounded key/value store for correlation state.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    ///
    /// Overwrites any existing entry and resets its TTL window.
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch the value under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Remove the entry under `key`. Removing a missing key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Key builders for the three correlation key spaces.
pub mod keys {
    /// Key for the per-request trace record.
    pub fn trace(request_id: &str) -> String {
        format!("trace:{request_id}")
    }

    /// Key for one outgoing-call record.
    pub fn outgoing(child_call_id: &str) -> String {
        format!("outgoing:{child_call_id}")
    }

    /// Key for the dispatch-ordered list of child call IDs.
    pub fn outgoing_list(request_id: &str) -> String {
        format!("outgoing_list:{request_id}")
    }
}
