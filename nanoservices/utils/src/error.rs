use thiserror::Error;

use crate::scalar::Scalar;

/// A single quality check that did not hold, carried inside
/// [`TaskError::GateFailed`] so run reports can name the offending checks.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckFailure {
    pub query: String,
    pub expected: Scalar,
    pub actual: Scalar,
}

impl std::fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`{}` returned {} (expected {})",
            self.query, self.actual, self.expected
        )
    }
}

/// Failure modes of a single task execution attempt.
///
/// The executor retries an attempt only when [`TaskError::is_retryable`]
/// holds; everything else settles the task immediately.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("warehouse write failed: {0}")]
    WarehouseWrite(String),

    #[error("warehouse query failed: {0}")]
    WarehouseQuery(String),

    #[error("check could not be evaluated: {0}")]
    CheckEvaluation(String),

    #[error("quality gate failed: {}", format_failures(.0))]
    GateFailed(Vec<CheckFailure>),

    #[error("task cancelled")]
    Cancelled,
}

fn format_failures(failures: &[CheckFailure]) -> String {
    failures
        .iter()
        .map(CheckFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl TaskError {
    /// Whether the executor should retry the attempt. Gate failures and
    /// malformed checks reproduce deterministically, so retrying them
    /// without upstream changes is pointless.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TaskError::SourceUnavailable(_)
                | TaskError::SchemaMismatch(_)
                | TaskError::WarehouseWrite(_)
                | TaskError::WarehouseQuery(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_retryable() {
        assert!(TaskError::SourceUnavailable("s3 listing timed out".into()).is_retryable());
        assert!(TaskError::WarehouseWrite("connection reset".into()).is_retryable());
        assert!(TaskError::WarehouseQuery("connection reset".into()).is_retryable());
    }

    #[test]
    fn gate_outcomes_are_not_retryable() {
        assert!(!TaskError::GateFailed(vec![]).is_retryable());
        assert!(!TaskError::CheckEvaluation("text vs numeric".into()).is_retryable());
        assert!(!TaskError::Cancelled.is_retryable());
    }

    #[test]
    fn check_failure_displays_query_and_values() {
        let failure = CheckFailure {
            query: "SELECT COUNT(*) FROM songplays".into(),
            expected: Scalar::Int(0),
            actual: Scalar::Int(7),
        };
        let msg = failure.to_string();
        assert!(msg.contains("songplays"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn gate_failure_names_every_violated_check() {
        let err = TaskError::GateFailed(vec![
            CheckFailure {
                query: "SELECT COUNT(*) FROM songplays".into(),
                expected: Scalar::Int(1),
                actual: Scalar::Int(0),
            },
            CheckFailure {
                query: "SELECT COUNT(*) FROM users".into(),
                expected: Scalar::Int(1),
                actual: Scalar::Int(0),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("quality gate failed"));
        assert!(msg.contains("FROM songplays"));
        assert!(msg.contains("FROM users"));
    }
}
