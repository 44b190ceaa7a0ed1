use std::collections::HashMap;

use serde::Deserialize;
use starlift_utils::Scalar;

use crate::tasks::CheckOp;

/// Top-level pipeline definition as loaded from YAML.
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub pipeline: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    pub tasks: HashMap<String, TaskConfig>,
}

/// Run-wide defaults applied to every task unless overridden per task.
#[derive(Debug, Deserialize, Default)]
pub struct DefaultsConfig {
    pub retries: Option<u32>,
    /// Humanized duration, e.g. "5m" or "30s".
    pub retry_delay: Option<String>,
    pub max_parallelism: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TaskConfig {
    pub kind: String,
    #[serde(default)]
    pub upstream: Option<StringOrVec>,

    // stage / load fields
    pub table: Option<String>,
    pub source: Option<String>,
    /// "auto" (default) or the object-store location of a column map.
    pub format: Option<String>,
    pub query: Option<String>,
    /// "replace" (default) or "append", dimension loads only.
    pub mode: Option<String>,

    // quality gate fields
    #[serde(default)]
    pub checks: Vec<CheckConfig>,

    // per-task retry overrides
    pub retries: Option<u32>,
    pub retry_delay: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckConfig {
    pub query: String,
    pub operator: CheckOp,
    pub value: Scalar,
}

/// Allows upstream to be either a single string or a list of strings.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum StringOrVec {
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrVec {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrVec::Single(s) => vec![s],
            StringOrVec::Multiple(v) => v,
        }
    }
}
