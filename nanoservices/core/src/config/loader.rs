use std::path::Path;
use std::time::Duration;

use crate::config::types::PipelineConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("task `{task}` has unknown kind `{kind}`")]
    UnknownKind { task: String, kind: String },

    #[error("task `{task}` is missing required field `{field}`")]
    MissingField { task: String, field: &'static str },

    #[error("task `{task}` has invalid mode `{mode}` (expected replace or append)")]
    InvalidMode { task: String, mode: String },

    #[error("invalid duration `{value}`: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("pipeline has no tasks")]
    NoTasks,
}

/// Load a pipeline config from a YAML file.
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<PipelineConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_pipeline(&content)
}

/// Parse a pipeline config from a YAML string.
pub fn parse_pipeline(yaml: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = serde_yaml::from_str(yaml)?;
    Ok(config)
}

/// Parse a humanized duration string like "5m" or "30s".
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|e| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
