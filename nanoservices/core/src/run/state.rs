use std::collections::HashMap;

use crate::dag::RunGraph;

/// Lifecycle of a single task within a run. Transitions only move forward:
/// `Pending -> Ready -> Running -> {Succeeded, Failed}`, with `Skipped`
/// reserved for tasks downstream of a permanent failure. Retries stay
/// inside `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Skipped
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Ready => "ready",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Running,
    Success,
    Failed,
}

/// What the run reports per task to its observability sink.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub name: String,
    pub state: TaskState,
    pub attempts: u32,
    pub failure: Option<String>,
}

/// Final report for one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub pipeline: String,
    pub outcome: RunOutcome,
    /// Per-task reports in topological order.
    pub tasks: Vec<TaskReport>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn task(&self, name: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == RunOutcome::Success
    }
}

/// Mutable execution state for one run. Owns nothing beyond the run: task
/// states die with it, and the graph itself stays immutable.
#[derive(Debug)]
pub struct RunState {
    states: HashMap<String, TaskState>,
    attempts: HashMap<String, u32>,
    failures: HashMap<String, String>,
}

impl RunState {
    pub fn new(graph: &RunGraph) -> Self {
        let states = graph
            .nodes()
            .map(|node| {
                let state = if node.is_root() {
                    TaskState::Ready
                } else {
                    TaskState::Pending
                };
                (node.name.clone(), state)
            })
            .collect();
        Self {
            states,
            attempts: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn state(&self, name: &str) -> TaskState {
        self.states.get(name).copied().unwrap_or(TaskState::Pending)
    }

    /// Tasks currently eligible for dispatch.
    pub fn ready_tasks(&self) -> Vec<String> {
        let mut ready: Vec<String> = self
            .states
            .iter()
            .filter(|(_, state)| **state == TaskState::Ready)
            .map(|(name, _)| name.clone())
            .collect();
        ready.sort();
        ready
    }

    pub fn mark_running(&mut self, name: &str) {
        self.states.insert(name.to_string(), TaskState::Running);
    }

    pub fn in_flight(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == TaskState::Running)
            .count()
    }

    /// Record a success and promote any direct dependents whose upstream
    /// set is now entirely succeeded. Returns the newly ready task names.
    pub fn task_succeeded(&mut self, name: &str, attempts: u32, graph: &RunGraph) -> Vec<String> {
        self.states.insert(name.to_string(), TaskState::Succeeded);
        self.attempts.insert(name.to_string(), attempts);

        let mut newly_ready = Vec::new();
        if let Some(children) = graph.dependents(name) {
            for child in children {
                if self.state(child) != TaskState::Pending {
                    continue;
                }
                let all_upstream_succeeded = graph
                    .dependencies(child)
                    .map(|deps| deps.iter().all(|d| self.state(d) == TaskState::Succeeded))
                    .unwrap_or(true);
                if all_upstream_succeeded {
                    self.states.insert(child.clone(), TaskState::Ready);
                    newly_ready.push(child.clone());
                }
            }
        }
        newly_ready.sort();
        newly_ready
    }

    /// Record a permanent failure and skip everything downstream of it.
    pub fn task_failed(&mut self, name: &str, attempts: u32, failure: String, graph: &RunGraph) {
        self.states.insert(name.to_string(), TaskState::Failed);
        self.attempts.insert(name.to_string(), attempts);
        self.failures.insert(name.to_string(), failure);

        for downstream in graph.transitive_dependents(name) {
            if !self.state(&downstream).is_terminal() {
                self.states.insert(downstream, TaskState::Skipped);
            }
        }
    }

    /// Whether every task has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.states.values().all(TaskState::is_terminal)
    }

    pub fn outcome(&self) -> RunOutcome {
        let any_bad = self
            .states
            .values()
            .any(|s| matches!(s, TaskState::Failed | TaskState::Skipped));
        if any_bad {
            // Failed and skipped nodes doom the run even while independent
            // branches are still finishing.
            if self.is_settled() {
                RunOutcome::Failed
            } else {
                RunOutcome::Running
            }
        } else if self.is_settled() {
            RunOutcome::Success
        } else {
            RunOutcome::Running
        }
    }

    /// Per-task reports in the graph's topological order.
    pub fn reports(&self, graph: &RunGraph) -> Vec<TaskReport> {
        graph
            .topological_order()
            .iter()
            .map(|name| TaskReport {
                name: name.clone(),
                state: self.state(name),
                attempts: self.attempts.get(name).copied().unwrap_or(0),
                failure: self.failures.get(name).cloned(),
            })
            .collect()
    }
}
