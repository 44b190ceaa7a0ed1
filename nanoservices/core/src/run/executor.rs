use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use starlift_utils::StarliftResult;
use tokio::sync::{mpsc, watch, Semaphore};
use uuid::Uuid;

use crate::connections::ConnectionHandles;
use crate::dag::RunGraph;
use crate::metrics;
use crate::run::retry::{self, RetryPolicy};
use crate::run::state::{RunOutcome, RunReport, RunState};
use crate::tasks::TaskContext;

/// Run-wide defaults threaded explicitly into every run, never ambient
/// state, so concurrent runs (and tests) cannot interfere.
#[derive(Debug, Clone)]
pub struct RunDefaults {
    pub owner: String,
    pub description: Option<String>,
    pub retry: RetryPolicy,
    pub max_parallelism: usize,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            owner: "etl".to_string(),
            description: None,
            retry: RetryPolicy::default(),
            max_parallelism: 4,
        }
    }
}

/// Handle an operator can use to cancel an in-progress run. In-flight
/// attempts finish; nothing new is dispatched.
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// What one settled task sends back to the run loop.
struct Settled {
    name: String,
    attempts: u32,
    result: StarliftResult<()>,
}

/// Walks a run graph in dependency order, dispatching ready tasks onto the
/// tokio runtime under a parallelism bound, retrying per policy, and
/// settling the overall outcome.
pub struct Executor {
    defaults: RunDefaults,
}

impl Executor {
    pub fn new(defaults: RunDefaults) -> Self {
        Self { defaults }
    }

    pub fn cancel_channel() -> (CancelHandle, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), rx)
    }

    /// Execute one run to completion.
    pub async fn run(
        &self,
        graph: &RunGraph,
        run_ts: DateTime<Utc>,
        handles: ConnectionHandles,
    ) -> RunReport {
        let (_cancel, cancel_rx) = Self::cancel_channel();
        self.run_with_cancel(graph, run_ts, handles, cancel_rx).await
    }

    /// Execute one run, honoring an external cancellation signal.
    pub async fn run_with_cancel(
        &self,
        graph: &RunGraph,
        run_ts: DateTime<Utc>,
        handles: ConnectionHandles,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let mut state = RunState::new(graph);

        tracing::info!(
            run = %run_id,
            pipeline = %graph.name(),
            description = self.defaults.description.as_deref().unwrap_or(""),
            owner = %self.defaults.owner,
            tasks = graph.len(),
            ts = %run_ts,
            "run started"
        );

        let (result_tx, mut result_rx) = mpsc::channel::<Settled>(graph.len().max(1));
        let semaphore = Arc::new(Semaphore::new(self.defaults.max_parallelism.max(1)));
        let ctx = TaskContext::new(run_ts, handles);

        let mut cancelled = false;
        let mut cancel_open = true;

        for name in state.ready_tasks() {
            self.dispatch(
                graph,
                &mut state,
                &name,
                &run_id,
                &ctx,
                &semaphore,
                &result_tx,
                &cancel_rx,
            );
        }

        loop {
            if state.is_settled() {
                break;
            }
            if state.in_flight() == 0 && cancelled {
                // Cancellation left part of the graph undispatched.
                break;
            }

            tokio::select! {
                Some(settled) = result_rx.recv() => {
                    match settled.result {
                        Ok(()) => {
                            metrics::inc_task(graph.name(), &settled.name, "succeeded");
                            let newly_ready =
                                state.task_succeeded(&settled.name, settled.attempts, graph);
                            tracing::info!(
                                run = %run_id,
                                task = %settled.name,
                                attempts = settled.attempts,
                                "task succeeded"
                            );
                            if !cancelled {
                                for name in newly_ready {
                                    self.dispatch(
                                        graph, &mut state, &name, &run_id,
                                        &ctx, &semaphore, &result_tx, &cancel_rx,
                                    );
                                }
                            }
                        }
                        Err(e) => {
                            metrics::inc_task(graph.name(), &settled.name, "failed");
                            tracing::error!(
                                run = %run_id,
                                task = %settled.name,
                                attempts = settled.attempts,
                                error = %e,
                                "task failed permanently"
                            );
                            state.task_failed(&settled.name, settled.attempts, e.to_string(), graph);
                        }
                    }
                }
                changed = cancel_rx.changed(), if cancel_open && !cancelled => {
                    match changed {
                        Ok(()) if *cancel_rx.borrow() => {
                            cancelled = true;
                            tracing::warn!(
                                run = %run_id,
                                "cancellation requested, letting in-flight tasks finish"
                            );
                        }
                        Ok(()) => {}
                        Err(_) => cancel_open = false,
                    }
                }
            }
        }

        // A cancelled run never reaches the end sentinel; report it failed
        // rather than leaving the outcome dangling.
        let outcome = match state.outcome() {
            RunOutcome::Running => RunOutcome::Failed,
            settled => settled,
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        metrics::observe_run_duration(graph.name(), outcome_label(outcome), duration_ms as f64);
        tracing::info!(
            run = %run_id,
            pipeline = %graph.name(),
            outcome = outcome_label(outcome),
            duration_ms,
            "run finished"
        );

        RunReport {
            run_id,
            pipeline: graph.name().to_string(),
            outcome,
            tasks: state.reports(graph),
            duration_ms,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &self,
        graph: &RunGraph,
        state: &mut RunState,
        name: &str,
        run_id: &str,
        ctx: &TaskContext,
        semaphore: &Arc<Semaphore>,
        result_tx: &mpsc::Sender<Settled>,
        cancel_rx: &watch::Receiver<bool>,
    ) {
        let Some(node) = graph.node(name) else {
            return;
        };
        state.mark_running(name);

        let name = name.to_string();
        let run_id = run_id.to_string();
        let kind = node.kind.clone();
        let policy = node.retry;
        let ctx = ctx.clone();
        let semaphore = Arc::clone(semaphore);
        let result_tx = result_tx.clone();
        let cancel_rx = cancel_rx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            tracing::debug!(run = %run_id, task = %name, kind = kind.label(), "task dispatched");

            let (attempts, result) =
                retry::execute_with_retry(policy, cancel_rx, &name, || kind.execute(&ctx)).await;

            let _ = result_tx
                .send(Settled {
                    name,
                    attempts,
                    result,
                })
                .await;
        });
    }
}

fn outcome_label(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Running => "running",
        RunOutcome::Success => "success",
        RunOutcome::Failed => "failed",
    }
}
