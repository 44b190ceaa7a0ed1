use std::collections::HashSet;

use crate::config::{ConfigError, PipelineConfig, TaskConfig};
use crate::dag::{GraphError, RunGraph, TaskNode};
use crate::run::{RetryPolicy, RunDefaults};
use crate::tasks::{
    Check, DimLoadConfig, GateConfig, LoadConfig, LoadMode, StageConfig, StageFormat, TaskKind,
};

/// Name of the sentinel node every root depends on.
pub const BEGIN_SENTINEL: &str = "begin_run";
/// Name of the sentinel node that depends on every leaf.
pub const END_SENTINEL: &str = "end_run";

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("pipeline has no tasks")]
    Empty,

    #[error("task name `{0}` collides with a sentinel node")]
    ReservedName(String),

    #[error("graph validation failed: {0}")]
    Graph(#[from] GraphError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Assembles task nodes into a validated run graph, bounding it with the
/// begin/end sentinels.
pub struct GraphBuilder {
    name: String,
    nodes: Vec<TaskNode>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    pub fn task(mut self, node: TaskNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn build(self) -> Result<RunGraph, BuildError> {
        if self.nodes.is_empty() {
            return Err(BuildError::Empty);
        }
        for node in &self.nodes {
            if node.name == BEGIN_SENTINEL || node.name == END_SENTINEL {
                return Err(BuildError::ReservedName(node.name.clone()));
            }
        }

        let mut nodes = self.nodes;

        // Leaves are the nodes nothing else depends on; the end sentinel
        // waits for all of them, the begin sentinel precedes every root.
        let mut has_dependents: HashSet<String> = HashSet::new();
        for node in &nodes {
            has_dependents.extend(node.upstream.iter().cloned());
        }
        let leaves: Vec<String> = nodes
            .iter()
            .filter(|n| !has_dependents.contains(&n.name))
            .map(|n| n.name.clone())
            .collect();

        for node in &mut nodes {
            if node.upstream.is_empty() {
                node.upstream.insert(BEGIN_SENTINEL.to_string());
            }
        }
        nodes.push(TaskNode::new(BEGIN_SENTINEL, TaskKind::Sentinel).with_retry(RetryPolicy::none()));
        nodes.push(
            TaskNode::new(END_SENTINEL, TaskKind::Sentinel)
                .with_retry(RetryPolicy::none())
                .after(leaves),
        );

        Ok(RunGraph::build(self.name, nodes)?)
    }
}

/// Convert a loaded pipeline config into a run graph plus the run defaults
/// it declares.
pub fn from_config(config: &PipelineConfig) -> Result<(RunGraph, RunDefaults), BuildError> {
    if config.tasks.is_empty() {
        return Err(BuildError::Config(ConfigError::NoTasks));
    }

    let mut defaults = RunDefaults {
        owner: config.owner.clone().unwrap_or_else(|| "etl".to_string()),
        description: config.description.clone(),
        ..RunDefaults::default()
    };
    if let Some(retries) = config.defaults.retries {
        defaults.retry.max_attempts = retries.max(1);
    }
    if let Some(delay) = &config.defaults.retry_delay {
        defaults.retry.delay = crate::config::parse_duration(delay)?;
    }
    if let Some(parallelism) = config.defaults.max_parallelism {
        defaults.max_parallelism = parallelism.max(1);
    }

    let mut builder = GraphBuilder::new(&config.pipeline);
    for (name, task) in &config.tasks {
        let kind = task_kind(name, task)?;
        let retry = task_retry(task, defaults.retry)?;
        let upstream = task
            .upstream
            .clone()
            .map(|u| u.into_vec())
            .unwrap_or_default();
        builder = builder.task(TaskNode::new(name, kind).after(upstream).with_retry(retry));
    }
    Ok((builder.build()?, defaults))
}

fn task_kind(name: &str, task: &TaskConfig) -> Result<TaskKind, ConfigError> {
    let require = |field: Option<&String>, label: &'static str| {
        field.cloned().ok_or(ConfigError::MissingField {
            task: name.to_string(),
            field: label,
        })
    };

    match task.kind.as_str() {
        "stage" => Ok(TaskKind::Stage(StageConfig {
            source: require(task.source.as_ref(), "source")?,
            table: require(task.table.as_ref(), "table")?,
            format: match task.format.as_deref() {
                None | Some("auto") => StageFormat::Auto,
                Some(location) => StageFormat::ColumnMap(location.to_string()),
            },
        })),
        "fact_load" => Ok(TaskKind::FactLoad(LoadConfig {
            table: require(task.table.as_ref(), "table")?,
            query: require(task.query.as_ref(), "query")?,
        })),
        "dim_load" => Ok(TaskKind::DimLoad(DimLoadConfig {
            table: require(task.table.as_ref(), "table")?,
            query: require(task.query.as_ref(), "query")?,
            mode: match task.mode.as_deref() {
                None | Some("replace") => LoadMode::Replace,
                Some("append") => LoadMode::Append,
                Some(other) => {
                    return Err(ConfigError::InvalidMode {
                        task: name.to_string(),
                        mode: other.to_string(),
                    })
                }
            },
        })),
        "quality_gate" => {
            if task.checks.is_empty() {
                return Err(ConfigError::MissingField {
                    task: name.to_string(),
                    field: "checks",
                });
            }
            Ok(TaskKind::QualityGate(GateConfig {
                checks: task
                    .checks
                    .iter()
                    .map(|c| Check {
                        query: c.query.clone(),
                        operator: c.operator,
                        value: c.value.clone(),
                    })
                    .collect(),
            }))
        }
        other => Err(ConfigError::UnknownKind {
            task: name.to_string(),
            kind: other.to_string(),
        }),
    }
}

fn task_retry(task: &TaskConfig, default: RetryPolicy) -> Result<RetryPolicy, ConfigError> {
    let mut retry = default;
    if let Some(retries) = task.retries {
        retry.max_attempts = retries.max(1);
    }
    if let Some(delay) = &task.retry_delay {
        retry.delay = crate::config::parse_duration(delay)?;
    }
    Ok(retry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_pipeline;
    use std::time::Duration;

    fn stage_node(name: &str) -> TaskNode {
        TaskNode::new(
            name,
            TaskKind::Stage(StageConfig {
                source: "log_data/{ds}".into(),
                table: "staging_events".into(),
                format: StageFormat::Auto,
            }),
        )
    }

    #[test]
    fn sentinels_bound_the_graph() {
        let graph = GraphBuilder::new("test")
            .task(stage_node("stage_events"))
            .task(stage_node("stage_songs"))
            .task(
                TaskNode::new(
                    "load_songplays",
                    TaskKind::FactLoad(LoadConfig {
                        table: "songplays".into(),
                        query: "SELECT 1".into(),
                    }),
                )
                .after(["stage_events", "stage_songs"]),
            )
            .build()
            .unwrap();

        assert_eq!(graph.len(), 5);
        assert_eq!(graph.topological_order().first().unwrap(), BEGIN_SENTINEL);
        assert_eq!(graph.topological_order().last().unwrap(), END_SENTINEL);

        // Roots hang off begin; the single leaf feeds end.
        assert!(graph
            .dependencies("stage_events")
            .unwrap()
            .contains(BEGIN_SENTINEL));
        let end_deps = graph.dependencies(END_SENTINEL).unwrap();
        assert_eq!(end_deps.len(), 1);
        assert!(end_deps.contains("load_songplays"));
    }

    #[test]
    fn empty_builder_is_rejected() {
        assert!(matches!(
            GraphBuilder::new("empty").build(),
            Err(BuildError::Empty)
        ));
    }

    #[test]
    fn reserved_names_are_rejected() {
        let err = GraphBuilder::new("bad")
            .task(stage_node(BEGIN_SENTINEL))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::ReservedName(_)));
    }

    #[test]
    fn dangling_upstream_is_a_build_error() {
        let err = GraphBuilder::new("bad")
            .task(stage_node("stage_events").after(["missing"]))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Graph(GraphError::UnknownUpstream { .. })
        ));
    }

    #[test]
    fn config_round_trips_into_a_graph_with_defaults() {
        let yaml = r#"
pipeline: music_warehouse
description: "Nightly star schema load"
owner: analytics
defaults:
  retries: 3
  retry_delay: 1s
  max_parallelism: 2
tasks:
  stage_events:
    kind: stage
    table: staging_events
    source: "log_data/{ds}"
  load_songplays:
    kind: fact_load
    upstream: [stage_events]
    table: songplays
    query: "SELECT * FROM staging_events"
    retries: 1
  quality_checks:
    kind: quality_gate
    upstream: [load_songplays]
    checks:
      - query: "SELECT COUNT(*) FROM songplays"
        operator: greater_than
        value: 0
"#;
        let config = parse_pipeline(yaml).unwrap();
        let (graph, defaults) = from_config(&config).unwrap();

        assert_eq!(graph.name(), "music_warehouse");
        assert_eq!(graph.len(), 5);
        assert_eq!(defaults.owner, "analytics");
        assert_eq!(defaults.description.as_deref(), Some("Nightly star schema load"));
        assert_eq!(defaults.retry.max_attempts, 3);
        assert_eq!(defaults.retry.delay, Duration::from_secs(1));
        assert_eq!(defaults.max_parallelism, 2);

        // Per-task override beats the default bound.
        assert_eq!(graph.node("load_songplays").unwrap().retry.max_attempts, 1);
        assert_eq!(graph.node("stage_events").unwrap().retry.max_attempts, 3);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let yaml = r#"
pipeline: bad
tasks:
  mystery:
    kind: shell_command
"#;
        let config = parse_pipeline(yaml).unwrap();
        let err = from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Config(ConfigError::UnknownKind { .. })
        ));
    }

    #[test]
    fn missing_field_is_rejected() {
        let yaml = r#"
pipeline: bad
tasks:
  stage_events:
    kind: stage
    table: staging_events
"#;
        let config = parse_pipeline(yaml).unwrap();
        let err = from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Config(ConfigError::MissingField { field: "source", .. })
        ));
    }
}
