use std::path::Path;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use starlift_utils::{Record, Scalar, StarliftResult, TaskError};
use tokio::sync::Mutex;

use crate::connections::traits::Warehouse;

/// SQLite-backed warehouse adapter. Serializes statements through one
/// connection, which is plenty for demos and tests; a production deployment
/// would swap in an adapter for its actual warehouse behind the same trait.
pub struct SqliteWarehouse {
    conn: Mutex<Connection>,
}

impl SqliteWarehouse {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            conn: Mutex::new(Connection::open(path)?),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, rusqlite::Error> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn execute(&self, sql: &str) -> StarliftResult<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(sql)
            .map_err(|e| TaskError::WarehouseWrite(e.to_string()))
    }

    async fn truncate(&self, table: &str) -> StarliftResult<()> {
        let conn = self.conn.lock().await;
        // SQLite has no TRUNCATE; an unqualified DELETE clears the table.
        conn.execute_batch(&format!("DELETE FROM {table}"))
            .map_err(|e| TaskError::WarehouseWrite(e.to_string()))
    }

    async fn copy_rows(&self, table: &str, rows: &[Record]) -> StarliftResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let columns = table_columns(&conn, table)?;

        for row in rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    return Err(TaskError::SchemaMismatch(format!(
                        "record field `{key}` has no column in table `{table}`"
                    )));
                }
            }
        }

        let tx = conn
            .transaction()
            .map_err(|e| TaskError::WarehouseWrite(e.to_string()))?;
        for row in rows {
            let cols: Vec<&str> = row.keys().map(String::as_str).collect();
            let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                cols.join(", "),
                placeholders.join(", ")
            );
            let params: Vec<rusqlite::types::Value> = row.values().map(to_sql_value).collect();
            tx.execute(&sql, rusqlite::params_from_iter(params))
                .map_err(|e| TaskError::WarehouseWrite(e.to_string()))?;
        }
        tx.commit()
            .map_err(|e| TaskError::WarehouseWrite(e.to_string()))
    }

    async fn query_scalar(&self, sql: &str) -> StarliftResult<Scalar> {
        let conn = self.conn.lock().await;
        conn.query_row(sql, [], |row| {
            Ok(match row.get_ref(0)? {
                ValueRef::Null => Scalar::Null,
                ValueRef::Integer(v) => Scalar::Int(v),
                ValueRef::Real(v) => Scalar::Float(v),
                ValueRef::Text(v) => Scalar::Text(String::from_utf8_lossy(v).into_owned()),
                ValueRef::Blob(_) => Scalar::Null,
            })
        })
        .map_err(|e| TaskError::WarehouseQuery(e.to_string()))
    }
}

fn table_columns(conn: &Connection, table: &str) -> StarliftResult<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| TaskError::WarehouseWrite(e.to_string()))?;
    let columns: Result<Vec<String>, rusqlite::Error> = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| TaskError::WarehouseWrite(e.to_string()))?
        .collect();
    let columns = columns.map_err(|e| TaskError::WarehouseWrite(e.to_string()))?;
    if columns.is_empty() {
        return Err(TaskError::SchemaMismatch(format!(
            "table `{table}` does not exist in the warehouse"
        )));
    }
    Ok(columns)
}

fn to_sql_value(value: &serde_json::Value) -> rusqlite::types::Value {
    match value {
        serde_json::Value::Null => rusqlite::types::Value::Null,
        serde_json::Value::Bool(b) => rusqlite::types::Value::Integer(*b as i64),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                rusqlite::types::Value::Integer(i)
            } else {
                rusqlite::types::Value::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        other => rusqlite::types::Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: serde_json::Value) -> Record {
        pairs.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn copy_then_count_round_trips() {
        let wh = SqliteWarehouse::in_memory().unwrap();
        wh.execute("CREATE TABLE staging_songs (song_id TEXT, title TEXT, year INTEGER)")
            .await
            .unwrap();

        wh.copy_rows(
            "staging_songs",
            &[
                row(json!({"song_id": "s1", "title": "one", "year": 1999})),
                row(json!({"song_id": "s2", "title": "two", "year": 2004})),
            ],
        )
        .await
        .unwrap();

        let count = wh
            .query_scalar("SELECT COUNT(*) FROM staging_songs")
            .await
            .unwrap();
        assert_eq!(count, Scalar::Int(2));
    }

    #[tokio::test]
    async fn truncate_clears_table() {
        let wh = SqliteWarehouse::in_memory().unwrap();
        wh.execute("CREATE TABLE t (n INTEGER)").await.unwrap();
        wh.copy_rows("t", &[row(json!({"n": 1}))]).await.unwrap();

        wh.truncate("t").await.unwrap();

        let count = wh.query_scalar("SELECT COUNT(*) FROM t").await.unwrap();
        assert_eq!(count, Scalar::Int(0));
    }

    #[tokio::test]
    async fn unknown_field_is_schema_mismatch() {
        let wh = SqliteWarehouse::in_memory().unwrap();
        wh.execute("CREATE TABLE t (n INTEGER)").await.unwrap();

        let err = wh
            .copy_rows("t", &[row(json!({"n": 1, "extra": "x"}))])
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn scalar_types_survive_query() {
        let wh = SqliteWarehouse::in_memory().unwrap();
        assert_eq!(
            wh.query_scalar("SELECT 2.5").await.unwrap(),
            Scalar::Float(2.5)
        );
        assert_eq!(
            wh.query_scalar("SELECT 'free'").await.unwrap(),
            Scalar::Text("free".into())
        );
        assert_eq!(wh.query_scalar("SELECT NULL").await.unwrap(), Scalar::Null);
    }

    #[tokio::test]
    async fn bad_query_is_warehouse_query_error() {
        let wh = SqliteWarehouse::in_memory().unwrap();
        let err = wh.query_scalar("SELECT FROM nothing").await.unwrap_err();
        assert!(matches!(err, TaskError::WarehouseQuery(_)));
    }
}
