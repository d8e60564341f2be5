//! Sequential batch evaluation of an agent against labeled tasks.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::Agent;
use crate::error::EvalError;
use crate::keywords::{matches, KeywordMode};
use crate::tasks::Task;

/// Outcome of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub timestamp: String,
    pub task: String,
    pub expected_keywords: Vec<String>,
    pub final_answer: String,
    pub success: bool,
    /// Set when the run failed and the batch carried on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Produces the final answer text for one task.
#[async_trait]
pub trait RunFunc<A: Agent + ?Sized>: Send + Sync {
    async fn call(&self, agent: &A, task: &str) -> Result<String, EvalError>;
}

/// Adapts a synchronous closure into a [`RunFunc`].
pub struct FnRunner<F>(pub F);

#[async_trait]
impl<A, F> RunFunc<A> for FnRunner<F>
where
    A: Agent + ?Sized,
    F: Fn(&A, &str) -> Result<String, EvalError> + Send + Sync,
{
    async fn call(&self, agent: &A, task: &str) -> Result<String, EvalError> {
        (self.0)(agent, task)
    }
}

#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub mode: KeywordMode,
    /// Record a failed task and continue instead of aborting the batch.
    pub isolate_failures: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            mode: KeywordMode::Lenient,
            isolate_failures: false,
        }
    }
}

/// Run every task in order with lenient scoring. The first failure aborts
/// the batch.
pub async fn evaluate<A, R>(
    agent: &A,
    tasks: &[Task],
    run_func: &R,
) -> Result<Vec<EvaluationResult>, EvalError>
where
    A: Agent + ?Sized,
    R: RunFunc<A> + ?Sized,
{
    evaluate_with(agent, tasks, run_func, &EvalOptions::default()).await
}

pub async fn evaluate_with<A, R>(
    agent: &A,
    tasks: &[Task],
    run_func: &R,
    options: &EvalOptions,
) -> Result<Vec<EvaluationResult>, EvalError>
where
    A: Agent + ?Sized,
    R: RunFunc<A> + ?Sized,
{
    let total = tasks.len();
    let mut results = Vec::with_capacity(total);
    info!(total, mode = %options.mode, "evaluating tasks");

    for (idx, task) in tasks.iter().enumerate() {
        let (final_answer, success, error) = match run_func.call(agent, &task.task).await {
            Ok(answer) => {
                let success = matches(&answer, &task.expected_keywords, options.mode);
                (answer, success, None)
            }
            Err(e) if options.isolate_failures => {
                warn!(task = idx + 1, total, error = %e, "task failed, continuing");
                (String::new(), false, Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        info!(task = idx + 1, total, success, "task evaluated");
        results.push(EvaluationResult {
            timestamp: Utc::now().to_rfc3339(),
            task: task.task.clone(),
            expected_keywords: task.expected_keywords.clone(),
            final_answer,
            success,
            error,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;

    struct NoAgent;

    #[async_trait]
    impl Agent for NoAgent {
        type Output = String;

        async fn run(&self, _task: &str) -> Result<String, AgentError> {
            Err(AgentError::new("not used"))
        }
    }

    fn runner() -> FnRunner<impl Fn(&NoAgent, &str) -> Result<String, EvalError> + Send + Sync> {
        FnRunner(|_: &NoAgent, task: &str| match task {
            "boom" => Err(EvalError::Agent(AgentError::new("exploded"))),
            other => Ok(format!("echo {other}")),
        })
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("alpha", &["ALPHA"]),
            Task::new("boom", &["x"]),
            Task::new("gamma", &["delta"]),
        ]
    }

    #[tokio::test]
    async fn scores_in_input_order() {
        let tasks = vec![Task::new("alpha", &["ALPHA"]), Task::new("gamma", &["delta"])];
        let results = evaluate(&NoAgent, &tasks, &runner()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].task, "alpha");
        assert!(results[0].success);
        assert_eq!(results[0].final_answer, "echo alpha");
        assert!(!results[1].success);
        assert!(results.iter().all(|r| r.error.is_none()));
    }

    #[tokio::test]
    async fn first_failure_aborts_by_default() {
        let err = evaluate(&NoAgent, &tasks(), &runner()).await.unwrap_err();
        assert!(err.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn isolated_failures_continue() {
        let options = EvalOptions {
            mode: KeywordMode::Strict,
            isolate_failures: true,
        };
        let results = evaluate_with(&NoAgent, &tasks(), &runner(), &options)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].final_answer, "");
        assert_eq!(results[1].error.as_deref(), Some("agent failed: exploded"));
        assert!(!results[2].success);
    }

    #[test]
    fn error_key_only_when_present() {
        let mut result = EvaluationResult {
            timestamp: "2025-06-01T00:00:00+00:00".to_string(),
            task: "t".to_string(),
            expected_keywords: vec![],
            final_answer: "a".to_string(),
            success: true,
            error: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json.as_object().unwrap().len(), 5);

        result.error = Some("boom".to_string());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error"], "boom");
    }
}
