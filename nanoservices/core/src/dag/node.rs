use std::collections::HashSet;

use crate::run::retry::RetryPolicy;
use crate::tasks::TaskKind;

/// One node of the run graph: a named task, its declared upstream set, and
/// the retry policy its attempts run under. Immutable once the graph is
/// built; per-run execution state lives in `run::state`, not here.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub name: String,
    pub kind: TaskKind,
    /// Names of nodes that must reach terminal success before this one is
    /// dispatched.
    pub upstream: HashSet<String>,
    pub retry: RetryPolicy,
}

impl TaskNode {
    pub fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
            upstream: HashSet::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Declare upstream dependencies.
    pub fn after<I, S>(mut self, upstream: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.upstream.extend(upstream.into_iter().map(Into::into));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_root(&self) -> bool {
        self.upstream.is_empty()
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.kind, TaskKind::Sentinel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_without_upstream_is_root() {
        let node = TaskNode::new("begin_run", TaskKind::Sentinel);
        assert!(node.is_root());
        assert!(node.is_sentinel());
    }

    #[test]
    fn after_accumulates_upstream_names() {
        let node = TaskNode::new(
            "load_songplays",
            TaskKind::FactLoad(crate::tasks::LoadConfig {
                table: "songplays".into(),
                query: "SELECT 1".into(),
            }),
        )
        .after(["stage_events"])
        .after(["stage_songs"]);

        assert_eq!(node.upstream.len(), 2);
        assert!(node.upstream.contains("stage_events"));
        assert!(!node.is_root());
        assert!(!node.is_sentinel());
    }
}
