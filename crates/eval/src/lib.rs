//! Call instrumentation and keyword-based evaluation for tool-using agents.

pub mod agent;
pub mod call_log;
pub mod error;
pub mod harness;
pub mod instrument;
pub mod keywords;
pub mod report;
mod rounding;
pub mod tasks;
pub mod tokenizer;

pub use agent::{Agent, AgentError, AgentStep, StepHistory, TokenReporting};
pub use call_log::{CallLogStats, CallRecord, CallSink, CsvCallLog, InMemoryCallLog};
pub use error::EvalError;
pub use harness::{evaluate, evaluate_with, EvalOptions, EvaluationResult, FnRunner, RunFunc};
pub use instrument::CallInstrumentor;
pub use keywords::{check_keywords_in_answer, matches, KeywordMode};
pub use report::{print_summary, EvaluationReport};
pub use tasks::{load_tasks, parse_tasks, save_results, Task};
pub use tokenizer::{count_tokens_opt, BpeTokenizer, Tokenizer, WhitespaceTokenizer};
