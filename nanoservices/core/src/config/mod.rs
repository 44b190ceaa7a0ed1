pub mod loader;
pub mod types;

pub use loader::{load_pipeline, parse_duration, parse_pipeline, ConfigError};
pub use types::{CheckConfig, DefaultsConfig, PipelineConfig, StringOrVec, TaskConfig};
