use serde::{Deserialize, Serialize};
use starlift_utils::{CheckFailure, Scalar, StarliftResult, TaskError};

use crate::tasks::TaskContext;

/// Comparison applied between a check's scalar result and its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOp {
    GreaterThan,
    GreaterOrEqual,
    Equal,
    NotEqual,
    LessOrEqual,
    LessThan,
}

impl CheckOp {
    fn symbol(&self) -> &'static str {
        match self {
            CheckOp::GreaterThan => ">",
            CheckOp::GreaterOrEqual => ">=",
            CheckOp::Equal => "==",
            CheckOp::NotEqual => "!=",
            CheckOp::LessOrEqual => "<=",
            CheckOp::LessThan => "<",
        }
    }
}

/// One assertion: a scalar query, an operator, and a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub query: String,
    pub operator: CheckOp,
    pub value: Scalar,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub checks: Vec<Check>,
}

/// Outcome of a single evaluated check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub check: Check,
    pub actual: Scalar,
    pub passed: bool,
}

/// Complete pass/fail record for a gate execution, in check order.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

/// Run every configured check against the warehouse. All checks are
/// evaluated even after one fails, so the report is complete; the gate as a
/// whole fails if any check is violated or cannot be evaluated.
pub async fn execute(cfg: &GateConfig, ctx: &TaskContext) -> StarliftResult<CheckReport> {
    let mut report = CheckReport::default();
    let mut failures = Vec::new();
    let mut eval_errors = Vec::new();

    for check in &cfg.checks {
        let actual = match ctx.warehouse.query_scalar(&check.query).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(query = %check.query, error = %e, "check query failed");
                eval_errors.push(format!("`{}`: {e}", check.query));
                continue;
            }
        };

        match evaluate(check.operator, &actual, &check.value) {
            Ok(true) => {
                tracing::info!(
                    query = %check.query,
                    actual = %actual,
                    "check passed ({} {} {})", actual, check.operator.symbol(), check.value
                );
                report.results.push(CheckResult {
                    check: check.clone(),
                    actual,
                    passed: true,
                });
            }
            Ok(false) => {
                tracing::warn!(
                    query = %check.query,
                    actual = %actual,
                    expected = %check.value,
                    "check violated"
                );
                failures.push(CheckFailure {
                    query: check.query.clone(),
                    expected: check.value.clone(),
                    actual: actual.clone(),
                });
                report.results.push(CheckResult {
                    check: check.clone(),
                    actual,
                    passed: false,
                });
            }
            Err(e) => {
                tracing::error!(query = %check.query, error = %e, "check not evaluable");
                eval_errors.push(format!("`{}`: {e}", check.query));
            }
        }
    }

    if !eval_errors.is_empty() {
        return Err(TaskError::CheckEvaluation(eval_errors.join("; ")));
    }
    if !failures.is_empty() {
        return Err(TaskError::GateFailed(failures));
    }
    Ok(report)
}

/// Compare a scalar against a threshold. Ordering operators require both
/// sides to be numeric; equality also covers text-to-text. Anything else is
/// an evaluation error rather than a violation.
pub fn evaluate(op: CheckOp, actual: &Scalar, expected: &Scalar) -> StarliftResult<bool> {
    match op {
        CheckOp::Equal | CheckOp::NotEqual => {
            let eq = match (actual, expected) {
                (Scalar::Text(a), Scalar::Text(b)) => a == b,
                (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
                _ => return Err(type_mismatch(actual, expected)),
            };
            Ok(if op == CheckOp::Equal { eq } else { !eq })
        }
        _ => {
            let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) else {
                return Err(type_mismatch(actual, expected));
            };
            Ok(match op {
                CheckOp::GreaterThan => a > b,
                CheckOp::GreaterOrEqual => a >= b,
                CheckOp::LessOrEqual => a <= b,
                CheckOp::LessThan => a < b,
                CheckOp::Equal | CheckOp::NotEqual => unreachable!(),
            })
        }
    }
}

fn type_mismatch(actual: &Scalar, expected: &Scalar) -> TaskError {
    TaskError::CheckEvaluation(format!(
        "cannot compare {} value against {} threshold",
        actual.type_name(),
        expected.type_name()
    ))
}
