//! The capability surface the instrumentor needs from an agent.
//!
//! Only `run` is mandatory. Token self-reporting and step history are optional
//! capabilities; when an agent does not expose them the instrumentor falls
//! back to counting tokens itself.

use std::fmt::Display;

use async_trait::async_trait;

/// Opaque agent failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AgentError {
    message: String,
}

impl AgentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(e: anyhow::Error) -> Self {
        Self::new(format!("{e:#}"))
    }
}

/// One reasoning step of an agent run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentStep {
    /// What the model was shown for this step.
    pub model_input: Option<String>,
    /// What the model produced.
    pub model_output: Option<String>,
}

/// Token counts the agent measured for its most recent model call.
/// Each side may be unknown independently.
pub trait TokenReporting: Send + Sync {
    fn last_input_tokens(&self) -> Option<u64>;
    fn last_output_tokens(&self) -> Option<u64>;
}

/// Access to the agent's reasoning history.
pub trait StepHistory: Send + Sync {
    /// Most recent step, if any step was recorded.
    fn last_step(&self) -> Option<AgentStep>;

    /// Tools invoked during the most recent run, in call order.
    fn last_tools_used(&self) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    type Output: Display + Send;

    async fn run(&self, task: &str) -> Result<Self::Output, AgentError>;

    fn token_reporting(&self) -> Option<&dyn TokenReporting> {
        None
    }

    fn step_history(&self) -> Option<&dyn StepHistory> {
        None
    }
}
