//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.tracer.enabled);
        assert_eq!(config.tracer.cache_ttl, 300);
        assert_eq!(config.tracer.max_response_log_size, 2048);
    }

    #[test]
    fn tracer_section_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            [tracer]
            enabled = false
            cache_ttl = 60
            sensitive_fields = ["ssn"]
            "#,
        )
        .unwrap();
        assert!(!config.tracer.enabled);
        assert_eq!(config.tracer.cache_ttl, 60);
        assert_eq!(config.tracer.sensitive_fields, vec!["ssn".to_string()]);
    }
}
