//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::LayerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LayerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<LayerConfig, ConfigError> {
    let config: LayerConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.table.initial_capacity, 64);
        assert_eq!(config.table.max_conn_streams, 0);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn partial_sections() {
        let config = parse_config(
            r#"
            [table]
            max_conn_streams = 128

            [observability]
            log_format = "json"
            metrics_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.table.max_conn_streams, 128);
        assert_eq!(config.table.initial_capacity, 64);
        assert_eq!(config.observability.log_format, "json");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn validation_errors_are_joined() {
        let err = parse_config("[observability]\nlog_level = \"chatty\"\nlog_format = \"xml\"\n")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: unknown log level `chatty`, unknown log format `xml`"
        );
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        assert!(matches!(
            parse_config("[table\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/cslayer.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
