//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTL > 0, sane size limits)
//! - Check that mask pattern overrides compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::AppConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the full configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: format!("not a valid socket address: {}", config.listener.bind_address),
        });
    }

    if config.tracer.cache_ttl == 0 {
        errors.push(ValidationError {
            field: "tracer.cache_ttl".into(),
            message: "TTL must be nonzero".into(),
        });
    }

    if config.tracer.max_child_body_len == 0 {
        errors.push(ValidationError {
            field: "tracer.max_child_body_len".into(),
            message: "body capture limit must be nonzero".into(),
        });
    }

    for (field, pattern) in [
        ("tracer.mask_patterns.mobile", &config.tracer.mask_patterns.mobile),
        ("tracer.mask_patterns.email", &config.tracer.mask_patterns.email),
    ] {
        if let Some(p) = pattern {
            if let Err(e) = regex::Regex::new(p) {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("pattern does not compile: {e}"),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
