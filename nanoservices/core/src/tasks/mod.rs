pub mod load;
pub mod quality;
pub mod stage;

use chrono::{DateTime, Utc};
use starlift_utils::StarliftResult;

use crate::connections::ConnectionHandles;

pub use load::{DimLoadConfig, LoadConfig, LoadMode};
pub use quality::{Check, CheckOp, CheckReport, GateConfig};
pub use stage::{StageConfig, StageFormat};

/// Everything a task execution attempt can see: the run's logical timestamp
/// and the connection handles checked out for the run.
#[derive(Clone)]
pub struct TaskContext {
    pub run_ts: DateTime<Utc>,
    pub handles: ConnectionHandles,
}

impl TaskContext {
    pub fn new(run_ts: DateTime<Utc>, handles: ConnectionHandles) -> Self {
        Self { run_ts, handles }
    }
}

impl std::ops::Deref for TaskContext {
    type Target = ConnectionHandles;

    fn deref(&self) -> &Self::Target {
        &self.handles
    }
}

/// The closed set of task behaviors, dispatched by kind. No kind extends
/// another's behavior, so a tagged union beats a trait hierarchy here.
#[derive(Debug, Clone)]
pub enum TaskKind {
    /// Run-bounding sentinel; executes as a no-op.
    Sentinel,
    Stage(StageConfig),
    FactLoad(LoadConfig),
    DimLoad(DimLoadConfig),
    QualityGate(GateConfig),
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Sentinel => "sentinel",
            TaskKind::Stage(_) => "stage",
            TaskKind::FactLoad(_) => "fact_load",
            TaskKind::DimLoad(_) => "dim_load",
            TaskKind::QualityGate(_) => "quality_gate",
        }
    }

    /// Execute one attempt of this task. Idempotency is the task's own
    /// responsibility; the executor may call this again after a retryable
    /// failure without rolling back partial effects.
    pub async fn execute(&self, ctx: &TaskContext) -> StarliftResult<()> {
        match self {
            TaskKind::Sentinel => Ok(()),
            TaskKind::Stage(cfg) => stage::execute(cfg, ctx).await,
            TaskKind::FactLoad(cfg) => load::execute_fact(cfg, ctx).await,
            TaskKind::DimLoad(cfg) => load::execute_dim(cfg, ctx).await,
            TaskKind::QualityGate(cfg) => {
                let report = quality::execute(cfg, ctx).await?;
                tracing::info!(checks = report.results.len(), "quality gate passed");
                Ok(())
            }
        }
    }
}
