use starlift_utils::StarliftResult;

use crate::tasks::TaskContext;

/// Fact-table load: one insert-via-query against staged data.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub table: String,
    /// A SELECT reading from staging tables; the task wraps it in an
    /// INSERT against the destination.
    pub query: String,
}

/// Whether a dimension load clears its table first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Truncate-then-insert; reruns land on the same final state.
    #[default]
    Replace,
    /// Insert without clearing; the caller owns duplicate avoidance.
    Append,
}

#[derive(Debug, Clone)]
pub struct DimLoadConfig {
    pub table: String,
    pub query: String,
    pub mode: LoadMode,
}

/// Populate the fact table from staged rows.
///
/// The fact table is deliberately not cleared first: repeated runs without
/// re-staging will duplicate fact rows. That is an operational precondition
/// of the pipeline, not something this task guards against.
pub async fn execute_fact(cfg: &LoadConfig, ctx: &TaskContext) -> StarliftResult<()> {
    insert_via_query(ctx, &cfg.table, &cfg.query).await?;
    tracing::info!(table = %cfg.table, "loaded fact table");
    Ok(())
}

/// Populate one dimension table, honoring the configured load mode.
pub async fn execute_dim(cfg: &DimLoadConfig, ctx: &TaskContext) -> StarliftResult<()> {
    if cfg.mode == LoadMode::Replace {
        ctx.warehouse.truncate(&cfg.table).await?;
    }
    insert_via_query(ctx, &cfg.table, &cfg.query).await?;
    tracing::info!(table = %cfg.table, mode = ?cfg.mode, "loaded dimension table");
    Ok(())
}

async fn insert_via_query(ctx: &TaskContext, table: &str, query: &str) -> StarliftResult<()> {
    ctx.warehouse
        .execute(&format!("INSERT INTO {table} {query}"))
        .await
}
