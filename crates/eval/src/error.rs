use std::time::Duration;

use finagent_core::ErrorKind;
use thiserror::Error;

use crate::agent::AgentError;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("agent failed: {0}")]
    Agent(#[from] AgentError),

    #[error("agent call timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("cannot summarize an empty evaluation batch")]
    EmptyBatch,

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("task file line {line}: {message}")]
    TaskParse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::InvalidArgument(_) | EvalError::TaskParse { .. } | EvalError::EmptyBatch => {
                ErrorKind::InvalidArgument
            }
            EvalError::Agent(_) | EvalError::Timeout(_) => ErrorKind::ExternalService,
            EvalError::Io(_) | EvalError::Csv(_) => ErrorKind::ResourceAccess,
            EvalError::Tokenizer(_) | EvalError::Json(_) => ErrorKind::Internal,
        }
    }
}
