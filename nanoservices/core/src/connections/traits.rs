use std::sync::Arc;

use async_trait::async_trait;
use starlift_utils::{Record, Scalar, StarliftResult};

/// A warehouse connection checked out for the duration of one run.
///
/// Implementations map their native errors onto the task error taxonomy:
/// write-path failures become `WarehouseWrite`, read-path failures become
/// `WarehouseQuery`, and rows that do not fit the destination table become
/// `SchemaMismatch`.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute a statement that returns no rows.
    async fn execute(&self, sql: &str) -> StarliftResult<()>;

    /// Destructively clear a table.
    async fn truncate(&self, table: &str) -> StarliftResult<()>;

    /// Bulk-append raw records into a staging table.
    async fn copy_rows(&self, table: &str, rows: &[Record]) -> StarliftResult<()>;

    /// Run a query expected to return a single scalar value.
    async fn query_scalar(&self, sql: &str) -> StarliftResult<Scalar>;
}

/// An object store holding time-partitioned raw data.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch every record stored under a resolved location prefix.
    /// A prefix with no data behind it is `SourceUnavailable`.
    async fn fetch_records(&self, location: &str) -> StarliftResult<Vec<Record>>;

    /// Fetch a named descriptor object, e.g. a column-map document used to
    /// reshape records before staging.
    async fn fetch_descriptor(&self, location: &str) -> StarliftResult<serde_json::Value>;
}

/// The connection handles a run borrows from its (external) provider.
/// Shared, read-mostly; tasks never hold these across runs.
#[derive(Clone)]
pub struct ConnectionHandles {
    pub warehouse: Arc<dyn Warehouse>,
    pub object_store: Arc<dyn ObjectStore>,
}

impl ConnectionHandles {
    pub fn new(warehouse: Arc<dyn Warehouse>, object_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            warehouse,
            object_store,
        }
    }
}
