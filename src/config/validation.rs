//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and enumerated strings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LayerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::LayerConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown log level `{0}`")]
    LogLevel(String),

    #[error("unknown log format `{0}`")]
    LogFormat(String),

    #[error("initial_capacity {initial} exceeds max_conn_streams {max}")]
    Capacity { initial: usize, max: usize },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &LayerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.as_str()) {
        errors.push(ValidationError::LogLevel(obs.log_level.clone()));
    }
    if !LOG_FORMATS.contains(&obs.log_format.as_str()) {
        errors.push(ValidationError::LogFormat(obs.log_format.clone()));
    }

    let table = &config.table;
    if table.max_conn_streams != 0 && table.initial_capacity > table.max_conn_streams {
        errors.push(ValidationError::Capacity {
            initial: table.initial_capacity,
            max: table.max_conn_streams,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&LayerConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = LayerConfig::default();
        config.observability.log_level = "loud".into();
        config.observability.log_format = "xml".into();
        config.table.initial_capacity = 10;
        config.table.max_conn_streams = 4;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::LogLevel("loud".into()),
                ValidationError::LogFormat("xml".into()),
                ValidationError::Capacity { initial: 10, max: 4 },
            ]
        );
    }

    #[test]
    fn unbounded_table_ignores_initial_capacity() {
        let mut config = LayerConfig::default();
        config.table.initial_capacity = 1_000_000;
        assert!(validate_config(&config).is_ok());
    }
}
