//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tracer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the tracing backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request tracing settings.
    pub tracer: TracerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Request tracing configuration.
///
/// Controls the correlation store TTL, outgoing-call capture and the
/// masking deny-lists. All fields have defaults so a minimal config works.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Globally enable or disable request tracing.
    pub enabled: bool,

    /// Capture outgoing HTTP calls issued while handling a request.
    pub track_outgoing_requests: bool,

    /// TTL in seconds for correlation store entries.
    pub cache_ttl: u64,

    /// Maximum logged size (bytes) for sanitized response bodies.
    pub max_response_log_size: usize,

    /// Maximum captured length (chars) for outgoing-call response bodies.
    pub max_child_body_len: usize,

    /// Header names replaced wholesale before logging (lower-cased match).
    pub sensitive_headers: Vec<String>,

    /// Form/body field names replaced wholesale before logging.
    pub sensitive_fields: Vec<String>,

    /// Overrides for the built-in masking patterns.
    pub mask_patterns: MaskPatternConfig,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            track_outgoing_requests: true,
            cache_ttl: 300,
            max_response_log_size: 2048,
            max_child_body_len: 500,
            sensitive_headers: default_sensitive_headers(),
            sensitive_fields: default_sensitive_fields(),
            mask_patterns: MaskPatternConfig::default(),
        }
    }
}

fn default_sensitive_headers() -> Vec<String> {
    [
        "authorization",
        "cookie",
        "password",
        "token",
        "mobile",
        "phone",
        "email",
        "otp",
        "api_key",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_sensitive_fields() -> Vec<String> {
    [
        "password",
        "credit_card",
        "cvv",
        "token",
        "mobile",
        "mobile_no",
        "phone",
        "phone_number",
        "email",
        "email_address",
        "otp",
        "api_key",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Regex overrides for pattern masking.
///
/// `None` means use the built-in pattern from `mask::patterns`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MaskPatternConfig {
    /// Pattern matching phone-number-like digit runs.
    pub mobile: Option<String>,

    /// Pattern matching email addresses.
    pub email: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics recorder.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
        }
    }
}
