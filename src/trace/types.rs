//! Trace record types shared across the tracer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-request trace state, written at request start.
///
/// Completion metrics live in [`MetricsContext`]; this is only what must
/// survive in the correlation store while the handler runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Correlation key for the whole request lifetime.
    pub request_id: String,
    /// Wall-clock start, unix millis.
    pub start_unix_ms: u64,
    pub method: String,
    pub path: String,
    pub client_ip: String,
    pub user_agent: String,
}

/// One outgoing call nested under a main request.
///
/// Created at dispatch; the outcome is set exactly once at finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildCallRecord {
    /// `<main request id>_<random suffix>`.
    pub child_call_id: String,
    /// Back-reference to the owning request.
    pub main_request_id: String,
    pub method: String,
    pub uri: String,
    /// Sanitized request headers captured at dispatch.
    pub request_headers: Value,
    /// Wall-clock dispatch time, unix millis.
    pub dispatch_unix_ms: u64,
    /// Finalization outcome; `None` while the call is in flight.
    #[serde(default)]
    pub outcome: Option<ChildOutcome>,
    /// Finalize time minus dispatch time, millis.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Terminal outcome of one outgoing call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ChildOutcome {
    Success {
        status_code: u16,
        response_headers: Value,
        /// Response body capped at the configured capture length.
        truncated_body: String,
    },
    Failure {
        error_message: String,
        /// HTTP status carried by the error, or 500 when none applies.
        error_code: u16,
    },
}

/// Completion metrics attached to the consolidated trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsContext {
    /// Raw handler duration in millis.
    pub duration_ms: u64,
    /// Human-readable duration ("12.34 ms" / "1.2 s").
    pub duration: String,
    /// Human-readable response size ("1.25 KB").
    pub response_size: String,
    pub status_code: u16,
    /// Peak process memory at completion ("34.50 MB"), when observable.
    #[serde(default)]
    pub memory_peak: Option<String>,
    pub client_ip: String,
    pub user_agent: String,
    /// Correlated child calls in dispatch order.
    pub outgoing_requests: Vec<ChildCallRecord>,
}

/// The consolidated, sanitized record handed to the trace sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceLog {
    pub request_id: String,
    /// Sanitized request data (method, url, headers, input).
    pub request: Value,
    /// Sanitized response data (status, content type, body).
    pub response: Value,
    pub context: MetricsContext,
}

/// Current wall-clock time as unix millis.
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Format a duration the way the trace log records it.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{:.2} ms", secs * 1000.0)
    } else {
        format!("{secs:.2} s")
    }
}

/// Format a byte count as KB/MB.
pub fn format_size(bytes: usize) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes < MB {
        format!("{:.2} KB", bytes / 1024.0)
    } else {
        format!("{:.2} MB", bytes / MB)
    }
}

/// Format a memory amount the way the trace log records it.
pub fn format_memory(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    format!("{:.2} MB", bytes as f64 / MB)
}

/// Peak resident set size of this process, in bytes.
///
/// Read from `/proc/self/status` (`VmHWM`); not observable off Linux.
pub fn peak_memory_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        let line = status.lines().find(|l| l.starts_with("VmHWM:"))?;
        let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
        Some(kib * 1024)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sub_second_durations_as_ms() {
        assert_eq!(format_duration(Duration::from_millis(12)), "12.00 ms");
    }

    #[test]
    fn formats_long_durations_as_seconds() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50 s");
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(512), "0.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn formats_memory_in_mb() {
        assert_eq!(format_memory(34 * 1024 * 1024 + 512 * 1024), "34.50 MB");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn peak_memory_readable_from_proc() {
        let peak = peak_memory_bytes().unwrap();
        assert!(peak > 0);
    }

    #[test]
    fn outcome_roundtrips_through_json() {
        let record = ChildCallRecord {
            child_call_id: "abc_x1y2z3".into(),
            main_request_id: "abc".into(),
            method: "GET".into(),
            uri: "http://api.example.com/v1".into(),
            request_headers: serde_json::json!({}),
            dispatch_unix_ms: now_unix_ms(),
            outcome: Some(ChildOutcome::Failure {
                error_message: "connection refused".into(),
                error_code: 500,
            }),
            duration_ms: Some(5),
        };
        let value = serde_json::to_value(&record).unwrap();
        let back: ChildCallRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.outcome, record.outcome);
    }
}
