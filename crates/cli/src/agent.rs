//! Adapts the agentic loop to the evaluation `Agent` capability.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use finagent_eval::{Agent, AgentError, AgentStep, StepHistory, TokenReporting};
use finagent_tools::{AgenticLoop, Conversation, LastExchange, TokenUsage, ToolContext};
use tracing::debug;

/// Runs each task in a fresh conversation and remembers what the final model
/// call saw and reported.
pub struct ToolCallingAgent {
    agentic_loop: AgenticLoop,
    system_prompt: Option<String>,
    context: ToolContext,
    last_usage: Mutex<Option<TokenUsage>>,
    last_exchange: Mutex<Option<LastExchange>>,
    last_tools: Mutex<Vec<String>>,
}

impl ToolCallingAgent {
    pub fn new(agentic_loop: AgenticLoop, context: ToolContext) -> Self {
        Self {
            agentic_loop,
            system_prompt: None,
            context,
            last_usage: Mutex::new(None),
            last_exchange: Mutex::new(None),
            last_tools: Mutex::new(Vec::new()),
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Agent for ToolCallingAgent {
    type Output = String;

    async fn run(&self, task: &str) -> Result<String, AgentError> {
        // A run dropped by a timeout never reaches the updates below.
        *lock(&self.last_usage) = None;
        *lock(&self.last_exchange) = None;
        lock(&self.last_tools).clear();

        let mut conversation = match &self.system_prompt {
            Some(prompt) => Conversation::new().with_system_prompt(prompt.as_str()),
            None => Conversation::new(),
        };

        let result = self
            .agentic_loop
            .run(&mut conversation, task, &self.context)
            .await;
        *lock(&self.last_exchange) = conversation.last_exchange();

        let outcome = result.map_err(|e| AgentError::new(e.to_string()))?;
        debug!(
            iterations = outcome.iterations,
            tools = ?outcome.tools_used,
            provider = self.agentic_loop.provider_name(),
            "agent run finished"
        );
        *lock(&self.last_usage) = outcome.last_usage;
        *lock(&self.last_tools) = outcome.tools_used;
        Ok(outcome.final_text.unwrap_or_default())
    }

    fn token_reporting(&self) -> Option<&dyn TokenReporting> {
        Some(self)
    }

    fn step_history(&self) -> Option<&dyn StepHistory> {
        Some(self)
    }
}

impl TokenReporting for ToolCallingAgent {
    fn last_input_tokens(&self) -> Option<u64> {
        lock(&self.last_usage).map(|u| u.input_tokens)
    }

    fn last_output_tokens(&self) -> Option<u64> {
        lock(&self.last_usage).map(|u| u.output_tokens)
    }
}

impl StepHistory for ToolCallingAgent {
    fn last_step(&self) -> Option<AgentStep> {
        lock(&self.last_exchange).as_ref().map(|exchange| AgentStep {
            model_input: Some(exchange.input.clone()),
            model_output: exchange.output.clone(),
        })
    }

    fn last_tools_used(&self) -> Vec<String> {
        lock(&self.last_tools).clone()
    }
}
