pub use starlift_core as core;
pub use starlift_utils as utils;

// Convenience re-exports for common usage
pub use starlift_core::builder::{from_config, GraphBuilder};
pub use starlift_core::config::load_pipeline;
pub use starlift_core::connections::{
    ConnectionHandles, LocalObjectStore, MemoryObjectStore, ObjectStore, SqliteWarehouse, Warehouse,
};
pub use starlift_core::dag::{RunGraph, TaskNode};
pub use starlift_core::run::{Executor, RetryPolicy, RunDefaults, RunOutcome, RunReport};
pub use starlift_core::tasks::TaskKind;
pub use starlift_utils::{Record, Scalar, StarliftResult, TaskError};
