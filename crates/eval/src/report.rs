//! Aggregate pass/fail summary over an evaluation batch.

use std::fmt;

use serde::Serialize;

use crate::error::EvalError;
use crate::harness::EvaluationResult;
use crate::rounding::round2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Failed tasks whose run raised an error rather than a wrong answer.
    pub errored: usize,
    /// Percentage of passed tasks, rounded to two decimals.
    pub accuracy: f64,
}

impl EvaluationReport {
    pub fn from_results(results: &[EvaluationResult]) -> Result<Self, EvalError> {
        let total = results.len();
        if total == 0 {
            return Err(EvalError::EmptyBatch);
        }
        let passed = results.iter().filter(|r| r.success).count();
        let accuracy = round2(passed as f64 / total as f64 * 100.0);

        Ok(Self {
            total,
            passed,
            failed: total - passed,
            errored: results.iter().filter(|r| r.error.is_some()).count(),
            accuracy,
        })
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluation Summary:")?;
        writeln!(f, "Total tasks: {}", self.total)?;
        writeln!(f, "Passed: {}", self.passed)?;
        writeln!(f, "Failed: {}", self.failed)?;
        if self.errored > 0 {
            writeln!(f, "  of which errored: {}", self.errored)?;
        }
        write!(f, "Accuracy: {:.2}%", self.accuracy)
    }
}

/// Print the summary to stdout and return it.
pub fn print_summary(results: &[EvaluationResult]) -> Result<EvaluationReport, EvalError> {
    let report = EvaluationReport::from_results(results)?;
    println!("{report}");
    Ok(report)
}
