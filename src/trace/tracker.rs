//! Tracker operations over the correlation store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::TracerConfig;
use crate::mask::limit_str;
use crate::observability::metrics;
use crate::store::{keys, CorrelationStore, StoreError};
use crate::trace::types::{now_unix_ms, ChildCallRecord, ChildOutcome, TraceRecord};

/// Coordinates trace and child-call records against the correlation store.
///
/// All operations are best-effort: callers are expected to discard the
/// returned errors at the orchestration boundary.
#[derive(Clone)]
pub struct RequestTracker {
    store: Arc<dyn CorrelationStore>,
    ttl: Duration,
    max_child_body_len: usize,
}

impl RequestTracker {
    /// Build a tracker over `store` using the configured TTL and limits.
    pub fn new(store: Arc<dyn CorrelationStore>, config: &TracerConfig) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(config.cache_ttl),
            max_child_body_len: config.max_child_body_len,
        }
    }

    /// Derive a unique child call ID under `main_request_id`.
    ///
    /// The random suffix keeps repeated calls to the same destination
    /// distinct.
    pub fn child_call_id(main_request_id: &str) -> String {
        let suffix: String = (0..6).map(|_| fastrand::alphanumeric()).collect();
        format!("{main_request_id}_{suffix}")
    }

    /// Record the per-request trace state at request start.
    pub async fn start_trace(&self, record: &TraceRecord) -> Result<(), StoreError> {
        let value = serde_json::to_value(record).unwrap_or(Value::Null);
        self.store
            .put(&keys::trace(&record.request_id), value, self.ttl)
            .await?;
        metrics::record_trace_started();
        Ok(())
    }

    /// Record an outgoing call at dispatch time.
    ///
    /// Creates the child record and appends its ID to the owning request's
    /// dispatch-ordered list. Returns the new child call ID.
    pub async fn track_dispatch(
        &self,
        main_request_id: &str,
        method: &str,
        uri: &str,
        request_headers: Value,
    ) -> Result<String, StoreError> {
        let child_call_id = Self::child_call_id(main_request_id);
        let record = ChildCallRecord {
            child_call_id: child_call_id.clone(),
            main_request_id: main_request_id.to_string(),
            method: method.to_string(),
            uri: uri.to_string(),
            request_headers,
            dispatch_unix_ms: now_unix_ms(),
            outcome: None,
            duration_ms: None,
        };

        let value = serde_json::to_value(&record).unwrap_or(Value::Null);
        self.store
            .put(&keys::outgoing(&child_call_id), value, self.ttl)
            .await?;

        // Read-modify-write append; a lost update under concurrent appends
        // is accepted, tracing is best-effort.
        let list_key = keys::outgoing_list(main_request_id);
        let mut list = match self.store.get(&list_key).await? {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        list.push(Value::String(child_call_id.clone()));
        self.store.put(&list_key, Value::Array(list), self.ttl).await?;

        metrics::record_child_tracked();
        Ok(child_call_id)
    }

    /// Finalize an outgoing call with its outcome.
    ///
    /// A missing or expired record is a silent no-op. Captured bodies are
    /// capped before the record is rewritten.
    pub async fn finalize(
        &self,
        child_call_id: &str,
        outcome: ChildOutcome,
    ) -> Result<(), StoreError> {
        let key = keys::outgoing(child_call_id);
        let mut record: ChildCallRecord = match self.store.get(&key).await? {
            Some(value) => match serde_json::from_value(value) {
                Ok(record) => record,
                Err(_) => return Ok(()),
            },
            None => return Ok(()),
        };

        record.outcome = Some(match outcome {
            ChildOutcome::Success {
                status_code,
                response_headers,
                truncated_body,
            } => ChildOutcome::Success {
                status_code,
                response_headers,
                truncated_body: limit_str(&truncated_body, self.max_child_body_len, "..."),
            },
            failure => failure,
        });
        record.duration_ms = Some(now_unix_ms().saturating_sub(record.dispatch_unix_ms));

        let value = serde_json::to_value(&record).unwrap_or(Value::Null);
        self.store.put(&key, value, self.ttl).await?;
        metrics::record_child_finalized();
        Ok(())
    }

    /// Read back the trace record, or `None` if expired.
    pub async fn trace(&self, request_id: &str) -> Result<Option<TraceRecord>, StoreError> {
        let value = match self.store.get(&keys::trace(request_id)).await? {
            Some(value) => value,
            None => return Ok(None),
        };
        Ok(serde_json::from_value(value).ok())
    }

    /// Collect the child records for a request, in dispatch order.
    ///
    /// IDs whose records have expired or fail to parse are skipped.
    pub async fn tracked_children(
        &self,
        main_request_id: &str,
    ) -> Result<Vec<ChildCallRecord>, StoreError> {
        let list = match self.store.get(&keys::outgoing_list(main_request_id)).await? {
            Some(Value::Array(items)) => items,
            _ => return Ok(Vec::new()),
        };

        let mut records = Vec::with_capacity(list.len());
        for id in list {
            let Some(id) = id.as_str() else { continue };
            if let Some(value) = self.store.get(&keys::outgoing(id)).await? {
                if let Ok(record) = serde_json::from_value::<ChildCallRecord>(value) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Remove every store entry associated with a request.
    ///
    /// Deletes the trace entry, each child record referenced by the list,
    /// then the list itself.
    pub async fn purge(&self, request_id: &str) -> Result<(), StoreError> {
        self.store.delete(&keys::trace(request_id)).await?;

        let list_key = keys::outgoing_list(request_id);
        if let Some(Value::Array(items)) = self.store.get(&list_key).await? {
            for id in items {
                if let Some(id) = id.as_str() {
                    self.store.delete(&keys::outgoing(id)).await?;
                }
            }
        }
        self.store.delete(&list_key).await?;
        Ok(())
    }
}
