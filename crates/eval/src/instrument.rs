//! Wraps a single agent call with timing, token accounting and logging.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::call_log::{CallRecord, CallSink};
use crate::error::EvalError;
use crate::harness::RunFunc;
use crate::tokenizer::Tokenizer;

pub const DEFAULT_TOOL_LABEL: &str = "Auto";

const TASK_PREVIEW_CHARS: usize = 80;

pub struct CallInstrumentor {
    sink: Arc<dyn CallSink>,
    tokenizer: Arc<dyn Tokenizer>,
    tool_label: String,
    timeout: Option<Duration>,
}

/// Token counts, reasoning text and tool label attributed to one call.
struct Accounting {
    input_tokens: u64,
    output_tokens: u64,
    thought: String,
    tool_used: String,
}

impl CallInstrumentor {
    pub fn new(sink: Arc<dyn CallSink>, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            sink,
            tokenizer,
            tool_label: DEFAULT_TOOL_LABEL.to_string(),
            timeout: None,
        }
    }

    /// Label logged when the agent does not report which tools it used.
    pub fn with_tool_label(mut self, label: &str) -> Self {
        self.tool_label = label.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `agent` on `task` and log the call.
    ///
    /// A failed or timed-out run is still logged, with the error text and no
    /// answer, before the error is returned.
    pub async fn instrument<A: Agent + ?Sized>(
        &self,
        agent: &A,
        task: &str,
    ) -> Result<(A::Output, CallRecord), EvalError> {
        let start = Instant::now();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, agent.run(task)).await {
                Ok(result) => result.map_err(EvalError::from),
                Err(_) => Err(EvalError::Timeout(limit)),
            },
            None => agent.run(task).await.map_err(EvalError::from),
        };
        let elapsed = start.elapsed().as_secs_f64();

        let accounting = self.account(agent, task);
        let record = CallRecord::new(task, &accounting.tool_used, elapsed)
            .with_agent_thought(&accounting.thought);

        match outcome {
            Ok(output) => {
                let record = record
                    .with_tokens(accounting.input_tokens, accounting.output_tokens)
                    .with_final_answer(&output.to_string());
                info!(
                    task = %preview(task),
                    duration_secs = record.duration_seconds,
                    input_tokens = record.input_tokens,
                    output_tokens = record.output_tokens,
                    "agent call completed"
                );
                self.emit(&record);
                Ok((output, record))
            }
            Err(err) => {
                let record = record
                    .with_tokens(accounting.input_tokens, 0)
                    .with_error(&err.to_string());
                warn!(
                    task = %preview(task),
                    duration_secs = record.duration_seconds,
                    error = %err,
                    "agent call failed"
                );
                self.emit(&record);
                Err(err)
            }
        }
    }

    /// Self-reported counts win; otherwise count the last step's text. A step
    /// without model input counts the task instead. No step at all counts
    /// as an empty prompt.
    fn account<A: Agent + ?Sized>(&self, agent: &A, task: &str) -> Accounting {
        let history = agent.step_history();
        let step = history.and_then(|h| h.last_step());
        let (prompt, thought) = match &step {
            Some(step) => (
                step.model_input
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(task),
                step.model_output.as_deref().unwrap_or("").trim(),
            ),
            None => ("", ""),
        };

        let reported = agent.token_reporting();
        let input_tokens = reported
            .and_then(|r| r.last_input_tokens())
            .unwrap_or_else(|| self.tokenizer.count_tokens(prompt) as u64);
        let output_tokens = reported
            .and_then(|r| r.last_output_tokens())
            .unwrap_or_else(|| self.tokenizer.count_tokens(thought) as u64);

        let mut tools = history.map(|h| h.last_tools_used()).unwrap_or_default();
        let mut seen = HashSet::new();
        tools.retain(|name| seen.insert(name.clone()));
        let tool_used = if tools.is_empty() {
            self.tool_label.clone()
        } else {
            tools.join(", ")
        };

        Accounting {
            input_tokens,
            output_tokens,
            thought: thought.to_string(),
            tool_used,
        }
    }

    fn emit(&self, record: &CallRecord) {
        if let Err(e) = self.sink.append(record) {
            warn!(error = %e, "failed to append call record");
        }
    }
}

#[async_trait]
impl<A: Agent> RunFunc<A> for CallInstrumentor {
    async fn call(&self, agent: &A, task: &str) -> Result<String, EvalError> {
        let (output, _) = self.instrument(agent, task).await?;
        Ok(output.to_string())
    }
}

fn preview(task: &str) -> String {
    let mut chars = task.chars();
    let head: String = chars.by_ref().take(TASK_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentError, AgentStep, StepHistory, TokenReporting};
    use crate::call_log::InMemoryCallLog;
    use crate::tokenizer::WhitespaceTokenizer;

    #[derive(Default)]
    struct StubAgent {
        answer: Option<String>,
        step: Option<AgentStep>,
        reported: Option<(Option<u64>, Option<u64>)>,
        delay: Option<Duration>,
        tools: Vec<String>,
    }

    impl TokenReporting for StubAgent {
        fn last_input_tokens(&self) -> Option<u64> {
            self.reported.and_then(|r| r.0)
        }
        fn last_output_tokens(&self) -> Option<u64> {
            self.reported.and_then(|r| r.1)
        }
    }

    impl StepHistory for StubAgent {
        fn last_step(&self) -> Option<AgentStep> {
            self.step.clone()
        }

        fn last_tools_used(&self) -> Vec<String> {
            self.tools.clone()
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        type Output = String;

        async fn run(&self, _task: &str) -> Result<String, AgentError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer
                .clone()
                .ok_or_else(|| AgentError::new("model unavailable"))
        }

        fn token_reporting(&self) -> Option<&dyn TokenReporting> {
            self.reported.map(|_| self as &dyn TokenReporting)
        }

        fn step_history(&self) -> Option<&dyn StepHistory> {
            Some(self)
        }
    }

    fn instrumentor() -> (CallInstrumentor, Arc<InMemoryCallLog>) {
        let log = Arc::new(InMemoryCallLog::new());
        let inst = CallInstrumentor::new(log.clone(), Arc::new(WhitespaceTokenizer));
        (inst, log)
    }

    fn answering(answer: &str) -> StubAgent {
        StubAgent {
            answer: Some(answer.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn falls_back_to_tokenizer_on_last_step() {
        let (inst, log) = instrumentor();
        let agent = StubAgent {
            step: Some(AgentStep {
                model_input: Some("one two three".to_string()),
                model_output: Some("  four five \n".to_string()),
            }),
            ..answering("done")
        };

        let (output, record) = inst.instrument(&agent, "task text").await.unwrap();
        assert_eq!(output, "done");
        assert_eq!(record.input_tokens, 3);
        assert_eq!(record.output_tokens, 2);
        assert_eq!(record.agent_thought, "four five");
        assert_eq!(record.tool_used, "Auto");
        assert_eq!(log.records(), vec![record]);
    }

    #[tokio::test]
    async fn missing_model_input_counts_task() {
        let (inst, _log) = instrumentor();
        let agent = StubAgent {
            step: Some(AgentStep {
                model_input: None,
                model_output: None,
            }),
            ..answering("ok")
        };
        let (_, record) = inst.instrument(&agent, "a b c d").await.unwrap();
        assert_eq!(record.input_tokens, 4);
        assert_eq!(record.output_tokens, 0);
        assert_eq!(record.agent_thought, "");
    }

    #[tokio::test]
    async fn self_reported_counts_win_per_side() {
        let (inst, _log) = instrumentor();
        let agent = StubAgent {
            step: Some(AgentStep {
                model_input: Some("x y".to_string()),
                model_output: Some("z".to_string()),
            }),
            reported: Some((Some(120), None)),
            ..answering("ok")
        };
        let (_, record) = inst.instrument(&agent, "t").await.unwrap();
        assert_eq!(record.input_tokens, 120);
        assert_eq!(record.output_tokens, 1);
    }

    #[tokio::test]
    async fn failure_is_logged_then_returned() {
        let (inst, log) = instrumentor();
        let agent = StubAgent::default();

        let err = inst.instrument(&agent, "what now").await.unwrap_err();
        assert!(matches!(err, EvalError::Agent(_)));

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].final_answer, "");
        assert_eq!(records[0].error, "agent failed: model unavailable");
        assert_eq!(records[0].input_tokens, 0);
        assert_eq!(records[0].output_tokens, 0);
    }

    #[tokio::test]
    async fn agent_without_history_counts_empty_prompt() {
        struct BareAgent;

        #[async_trait]
        impl Agent for BareAgent {
            type Output = String;

            async fn run(&self, _task: &str) -> Result<String, AgentError> {
                Ok("four words of answer".to_string())
            }
        }

        let (inst, log) = instrumentor();
        let (output, record) = inst.instrument(&BareAgent, "a b c d e").await.unwrap();
        assert_eq!(output, "four words of answer");
        assert_eq!(record.input_tokens, 0);
        assert_eq!(record.output_tokens, 0);
        assert_eq!(record.agent_thought, "");
        assert_eq!(log.records().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_logged_then_returned() {
        let (inst, log) = instrumentor();
        let inst = inst.with_timeout(Duration::from_secs(5));
        let agent = StubAgent {
            delay: Some(Duration::from_secs(60)),
            ..answering("too late")
        };

        let err = inst.instrument(&agent, "slow").await.unwrap_err();
        assert!(matches!(err, EvalError::Timeout(_)));
        assert!(log.records()[0].error.contains("timed out"));
    }

    #[tokio::test]
    async fn sink_failure_does_not_change_result() {
        struct BrokenSink;
        impl CallSink for BrokenSink {
            fn append(&self, _record: &CallRecord) -> Result<(), EvalError> {
                Err(EvalError::Io(std::io::Error::other("disk full")))
            }
        }

        let inst = CallInstrumentor::new(Arc::new(BrokenSink), Arc::new(WhitespaceTokenizer))
            .with_tool_label("news_fetcher");
        let (output, record) = inst.instrument(&answering("fine"), "t").await.unwrap();
        assert_eq!(output, "fine");
        assert_eq!(record.tool_used, "news_fetcher");
    }

    #[tokio::test]
    async fn reported_tools_replace_the_label() {
        let (inst, log) = instrumentor();
        let agent = StubAgent {
            tools: ["time_tool", "currency_converter", "time_tool"]
                .map(String::from)
                .to_vec(),
            ..answering("It is noon and 1 USD is 0.92 EUR")
        };

        let (_, record) = inst.instrument(&agent, "time and rate").await.unwrap();
        assert_eq!(record.tool_used, "time_tool, currency_converter");
        assert_eq!(log.records()[0].tool_used, "time_tool, currency_converter");
    }

    #[tokio::test]
    async fn run_func_returns_display_text() {
        let (inst, _log) = instrumentor();
        let text = inst.call(&answering("The answer is 2"), "1+1").await.unwrap();
        assert_eq!(text, "The answer is 2");
    }

    #[test]
    fn long_tasks_are_previewed() {
        assert_eq!(preview("short"), "short");
        let long = "z".repeat(100);
        assert_eq!(preview(&long), format!("{}...", "z".repeat(80)));
    }
}
