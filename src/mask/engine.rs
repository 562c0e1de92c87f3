//! The masking engine: produces sanitized copies of values for logging.

use std::collections::HashSet;

use axum::http::HeaderMap;
use regex::Regex;
use serde_json::{Map, Value};

use crate::config::TracerConfig;
use crate::mask::patterns;

/// Placeholder stored in place of HTML response bodies.
pub const HTML_PLACEHOLDER: &str = "HTML_CONTENT";

/// Marker appended to truncated response bodies.
pub const TRUNCATED_MARKER: &str = "[TRUNCATED]";

/// Redacts denied field names and pattern-masks sensitive substrings.
///
/// Built once from config and shared read-only across requests.
pub struct MaskEngine {
    sensitive_headers: HashSet<String>,
    sensitive_fields: HashSet<String>,
    mobile: Regex,
    email: Regex,
}

impl MaskEngine {
    /// Build an engine from the tracer configuration.
    ///
    /// Fails only when a pattern override does not compile; validation
    /// normally catches that earlier.
    pub fn from_config(config: &TracerConfig) -> Result<Self, regex::Error> {
        let mobile = Regex::new(
            config
                .mask_patterns
                .mobile
                .as_deref()
                .unwrap_or(patterns::DEFAULT_MOBILE_PATTERN),
        )?;
        let email = Regex::new(
            config
                .mask_patterns
                .email
                .as_deref()
                .unwrap_or(patterns::DEFAULT_EMAIL_PATTERN),
        )?;

        Ok(Self {
            sensitive_headers: config
                .sensitive_headers
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            sensitive_fields: config
                .sensitive_fields
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            mobile,
            email,
        })
    }

    /// Pattern-mask one string: digit runs first, then emails.
    pub fn mask_str(&self, input: &str) -> String {
        let masked = self
            .mobile
            .replace_all(input, |caps: &regex::Captures| {
                patterns::mask_mobile(&caps[0])
            });
        self.email
            .replace_all(&masked, |caps: &regex::Captures| {
                patterns::mask_email(&caps[0])
            })
            .into_owned()
    }

    /// Pattern-mask a value, recursing through maps and arrays.
    ///
    /// Non-string scalars pass through unchanged. The input is never
    /// mutated; a new structure is returned.
    pub fn mask_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.mask_str(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.mask_value(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.mask_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Sanitize inbound/outbound headers into a loggable map.
    ///
    /// Denied header names are replaced wholesale; everything else is
    /// pattern-masked.
    pub fn sanitize_headers(&self, headers: &HeaderMap) -> Value {
        let mut out = Map::new();
        for key in headers.keys() {
            let name = key.as_str().to_lowercase();
            if self.sensitive_headers.contains(&name) {
                out.insert(
                    name.clone(),
                    Value::String(format!("***REDACTED_HEADER_{name}***")),
                );
                continue;
            }

            let mut values: Vec<Value> = headers
                .get_all(key)
                .iter()
                .map(|v| Value::String(self.mask_str(&String::from_utf8_lossy(v.as_bytes()))))
                .collect();
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            out.insert(name, value);
        }
        Value::Object(out)
    }

    /// Sanitize a form-input / body map.
    ///
    /// Denied field names are replaced wholesale (their values are never
    /// inspected); remaining values are pattern-masked recursively.
    pub fn sanitize_map(&self, input: &Map<String, Value>) -> Value {
        let mut out = Map::new();
        for (key, value) in input {
            let lower = key.to_lowercase();
            if self.sensitive_fields.contains(&lower) {
                out.insert(
                    key.clone(),
                    Value::String(format!("***REDACTED_FIELD_{lower}***")),
                );
                continue;
            }
            out.insert(key.clone(), self.mask_value(value));
        }
        Value::Object(out)
    }

    /// Sanitize a response body for logging.
    ///
    /// HTML is replaced with a fixed placeholder. JSON is parsed, masked
    /// recursively and re-serialized; anything that fails to parse is
    /// masked as one opaque string. The result is capped at `max_len`.
    pub fn sanitize_body(&self, content_type: Option<&str>, body: &str, max_len: usize) -> String {
        if content_type.is_some_and(|ct| ct.contains("text/html")) {
            return HTML_PLACEHOLDER.to_string();
        }

        let masked = match serde_json::from_str::<Value>(body) {
            Ok(parsed) => self.mask_value(&parsed).to_string(),
            Err(_) => self.mask_str(body),
        };

        limit_str(&masked, max_len, TRUNCATED_MARKER)
    }
}

/// Truncate `input` to `max` characters, appending `marker` when cut.
pub fn limit_str(input: &str, max: usize, marker: &str) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max).collect();
    out.push_str(marker);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn engine() -> MaskEngine {
        MaskEngine::from_config(&TracerConfig::default()).unwrap()
    }

    #[test]
    fn masks_ten_digit_runs() {
        assert_eq!(engine().mask_str("call 9876543210 now"), "call 987****210 now");
    }

    #[test]
    fn masks_emails() {
        assert_eq!(
            engine().mask_str("john.doe@example.com"),
            "j***e@example.com"
        );
    }

    #[test]
    fn redacts_denied_fields_wholesale() {
        let input = json!({"password": "hunter2", "name": "jo"});
        let map = input.as_object().unwrap();
        let out = engine().sanitize_map(map);
        assert_eq!(out["password"], "***REDACTED_FIELD_password***");
        assert_eq!(out["name"], "jo");
    }

    #[test]
    fn redaction_is_case_insensitive() {
        let input = json!({"Password": "hunter2"});
        let out = engine().sanitize_map(input.as_object().unwrap());
        assert_eq!(out["Password"], "***REDACTED_FIELD_password***");
    }

    #[test]
    fn masks_nested_structures_preserving_keys() {
        let input = json!({"user": {"email": "a@b.com", "note": "call 1234567890"}});
        let out = engine().sanitize_map(input.as_object().unwrap());
        assert_eq!(out["user"]["email"], "***@b.com");
        assert_eq!(out["user"]["note"], "call 123****890");
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let input = json!({"count": 42, "flag": true, "nothing": null});
        let out = engine().sanitize_map(input.as_object().unwrap());
        assert_eq!(out, input);
    }

    #[test]
    fn sanitizes_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("x-contact", HeaderValue::from_static("9876543210"));
        let out = engine().sanitize_headers(&headers);
        assert_eq!(out["authorization"], "***REDACTED_HEADER_authorization***");
        assert_eq!(out["x-contact"], "987****210");
    }

    #[test]
    fn html_body_replaced_with_placeholder() {
        let out = engine().sanitize_body(Some("text/html; charset=utf-8"), "<html>big</html>", 2048);
        assert_eq!(out, HTML_PLACEHOLDER);
    }

    #[test]
    fn json_body_masked_recursively() {
        let body = r#"{"email":"john.doe@example.com"}"#;
        let out = engine().sanitize_body(Some("application/json"), body, 2048);
        assert_eq!(out, r#"{"email":"j***e@example.com"}"#);
    }

    #[test]
    fn malformed_json_masked_as_opaque_string() {
        let out = engine().sanitize_body(Some("application/json"), "not json 9876543210", 2048);
        assert_eq!(out, "not json 987****210");
    }

    #[test]
    fn long_bodies_truncated_with_marker() {
        let body = "x".repeat(100);
        let out = engine().sanitize_body(Some("text/plain"), &body, 10);
        assert_eq!(out, format!("{}{}", "x".repeat(10), TRUNCATED_MARKER));
    }

    #[test]
    fn pattern_overrides_apply() {
        let mut config = TracerConfig::default();
        config.mask_patterns.mobile = Some(r"\b\d{8}\b".to_string());
        let engine = MaskEngine::from_config(&config).unwrap();
        assert_eq!(engine.mask_str("12345678"), "123****678");
    }
}
