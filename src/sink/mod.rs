//! Trace sink subsystem.
//!
//! # Data Flow
//! ```text
//! http/interceptor.rs (TERMINATING stage)
//!     → TraceSink::emit (fire-and-forget)
//!     → ChannelSink consumer task (drains off-request)
//!     → log/persistence collaborator
//! ```
//!
//! # Design Decisions
//! - `emit` never blocks the request path and is never awaited or retried
//! - A sink failure is logged and swallowed; the response already went out
//! - The channel consumer mirrors an external async log-writer queue

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::trace::TraceLog;

/// Destination for finalized trace records.
pub trait TraceSink: Send + Sync {
    /// Hand off one consolidated trace. Fire-and-forget.
    fn emit(&self, log: TraceLog);
}

/// Sink that writes traces straight through structured logging.
#[derive(Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn emit(&self, log: TraceLog) {
        write_log(&log);
    }
}

/// Sink backed by an unbounded channel drained by a consumer task.
///
/// The request path only pays for a channel send; the consumer does the
/// serialization and writing.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TraceLog>,
}

impl ChannelSink {
    /// Spawn the consumer task and return the sink handle.
    ///
    /// The consumer drains until the channel closes or shutdown fires.
    pub fn spawn(mut shutdown: broadcast::Receiver<()>) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<TraceLog>();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe = rx.recv() => match maybe {
                        Some(log) => write_log(&log),
                        None => break,
                    },
                    _ = shutdown.recv() => break,
                }
            }
        });
        Arc::new(Self { tx })
    }
}

impl TraceSink for ChannelSink {
    fn emit(&self, log: TraceLog) {
        if self.tx.send(log).is_err() {
            tracing::warn!("trace sink consumer stopped, dropping record");
        }
    }
}

fn write_log(log: &TraceLog) {
    match serde_json::to_string(log) {
        Ok(payload) => {
            tracing::info!(
                target: "request_trace",
                request_id = %log.request_id,
                status = log.context.status_code,
                outgoing = log.context.outgoing_requests.len(),
                %payload,
                "request trace"
            );
        }
        Err(e) => {
            tracing::error!(request_id = %log.request_id, error = %e, "failed to serialize trace");
        }
    }
}
