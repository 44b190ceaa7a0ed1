use chrono::{DateTime, Utc};
use starlift_utils::{Record, StarliftResult, TaskError};

use crate::tasks::TaskContext;

/// How staged records map onto the destination table's columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StageFormat {
    /// Record fields already match column names.
    #[default]
    Auto,
    /// A descriptor at this object-store location maps each destination
    /// column to the source record field it is read from.
    ColumnMap(String),
}

#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Object-store location, optionally templated with `{ds}` / `{ts}`.
    pub source: String,
    /// Destination staging table, cleared before every copy.
    pub table: String,
    pub format: StageFormat,
}

/// Copy one source partition into its staging table. The destructive clear
/// before the copy makes repeated runs land on the same final state.
pub async fn execute(cfg: &StageConfig, ctx: &TaskContext) -> StarliftResult<()> {
    let location = render_location(&cfg.source, ctx.run_ts);
    let mut rows = ctx.object_store.fetch_records(&location).await?;

    if let StageFormat::ColumnMap(descriptor) = &cfg.format {
        let map = ctx.object_store.fetch_descriptor(descriptor).await?;
        rows = remap_rows(rows, &map)?;
    }

    ctx.warehouse.truncate(&cfg.table).await?;
    ctx.warehouse.copy_rows(&cfg.table, &rows).await?;

    tracing::info!(
        table = %cfg.table,
        location = %location,
        rows = rows.len(),
        "staged source partition"
    );
    Ok(())
}

/// Resolve `{ds}` (date) and `{ts}` (full timestamp) placeholders against
/// the logical run timestamp.
pub fn render_location(template: &str, run_ts: DateTime<Utc>) -> String {
    template
        .replace("{ds}", &run_ts.format("%Y-%m-%d").to_string())
        .replace("{ts}", &run_ts.to_rfc3339())
}

fn remap_rows(rows: Vec<Record>, map: &serde_json::Value) -> StarliftResult<Vec<Record>> {
    let columns = map.as_object().ok_or_else(|| {
        TaskError::SchemaMismatch("column-map descriptor must be a JSON object".to_string())
    })?;

    let mut remapped = Vec::with_capacity(rows.len());
    for row in rows {
        let mut out = Record::new();
        for (column, field) in columns {
            let field = field.as_str().ok_or_else(|| {
                TaskError::SchemaMismatch(format!(
                    "column-map entry for `{column}` must name a source field"
                ))
            })?;
            let value = row.get(field).cloned().unwrap_or(serde_json::Value::Null);
            out.insert(column.clone(), value);
        }
        remapped.push(out);
    }
    Ok(remapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{ConnectionHandles, MemoryObjectStore, SqliteWarehouse, Warehouse};
    use chrono::TimeZone;
    use serde_json::json;
    use starlift_utils::Scalar;
    use std::sync::Arc;

    fn row(pairs: serde_json::Value) -> Record {
        pairs.as_object().unwrap().clone()
    }

    fn ctx_for(
        warehouse: Arc<SqliteWarehouse>,
        store: Arc<MemoryObjectStore>,
    ) -> TaskContext {
        TaskContext {
            run_ts: Utc.with_ymd_and_hms(2019, 1, 12, 0, 0, 0).unwrap(),
            handles: ConnectionHandles::new(warehouse, store),
        }
    }

    #[test]
    fn location_template_resolves_run_timestamp() {
        let ts = Utc.with_ymd_and_hms(2019, 1, 12, 6, 30, 0).unwrap();
        assert_eq!(
            render_location("log_data/{ds}", ts),
            "log_data/2019-01-12"
        );
        assert!(render_location("dump/{ts}", ts).starts_with("dump/2019-01-12T06:30:00"));
        assert_eq!(render_location("song_data/A/A", ts), "song_data/A/A");
    }

    #[tokio::test]
    async fn stage_is_idempotent_across_reruns() {
        let warehouse = Arc::new(SqliteWarehouse::in_memory().unwrap());
        warehouse
            .execute("CREATE TABLE staging_events (artist TEXT, song TEXT)")
            .await
            .unwrap();

        let store = Arc::new(MemoryObjectStore::new());
        store.put_partition(
            "log_data/2019-01-12",
            vec![
                row(json!({"artist": "a", "song": "x"})),
                row(json!({"artist": "b", "song": "y"})),
            ],
        );

        let cfg = StageConfig {
            source: "log_data/{ds}".into(),
            table: "staging_events".into(),
            format: StageFormat::Auto,
        };
        let ctx = ctx_for(warehouse.clone(), store);

        execute(&cfg, &ctx).await.unwrap();
        execute(&cfg, &ctx).await.unwrap();

        let count = warehouse
            .query_scalar("SELECT COUNT(*) FROM staging_events")
            .await
            .unwrap();
        assert_eq!(count, Scalar::Int(2));
    }

    #[tokio::test]
    async fn column_map_reshapes_records() {
        let warehouse = Arc::new(SqliteWarehouse::in_memory().unwrap());
        warehouse
            .execute("CREATE TABLE staging_events (artist_name TEXT, song_title TEXT)")
            .await
            .unwrap();

        let store = Arc::new(MemoryObjectStore::new());
        store.put_partition(
            "log_data/2019-01-12",
            vec![row(json!({"artist": "a", "song": "x", "ignored": true}))],
        );
        store.put_descriptor(
            "log_json_path.json",
            json!({"artist_name": "artist", "song_title": "song"}),
        );

        let cfg = StageConfig {
            source: "log_data/{ds}".into(),
            table: "staging_events".into(),
            format: StageFormat::ColumnMap("log_json_path.json".into()),
        };
        let ctx = ctx_for(warehouse.clone(), store);
        execute(&cfg, &ctx).await.unwrap();

        let name = warehouse
            .query_scalar("SELECT artist_name FROM staging_events")
            .await
            .unwrap();
        assert_eq!(name, Scalar::Text("a".into()));
    }

    #[tokio::test]
    async fn missing_partition_fails_before_clearing_table() {
        let warehouse = Arc::new(SqliteWarehouse::in_memory().unwrap());
        warehouse
            .execute("CREATE TABLE staging_events (artist TEXT); \
                      INSERT INTO staging_events VALUES ('keep')")
            .await
            .unwrap();

        let cfg = StageConfig {
            source: "log_data/{ds}".into(),
            table: "staging_events".into(),
            format: StageFormat::Auto,
        };
        let ctx = ctx_for(warehouse.clone(), Arc::new(MemoryObjectStore::new()));

        let err = execute(&cfg, &ctx).await.unwrap_err();
        assert!(matches!(err, TaskError::SourceUnavailable(_)));

        // The fetch failed up front, so the prior staging content survives.
        let count = warehouse
            .query_scalar("SELECT COUNT(*) FROM staging_events")
            .await
            .unwrap();
        assert_eq!(count, Scalar::Int(1));
    }
}
