pub mod error;
pub mod scalar;

pub use error::{CheckFailure, TaskError};
pub use scalar::Scalar;

pub type StarliftResult<T> = Result<T, TaskError>;

/// One row of raw data as it travels between the object store and the
/// warehouse: column name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;
