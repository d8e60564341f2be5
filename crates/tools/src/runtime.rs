use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::chat::{ChatModel, ChatRequest, LlmError, StopReason, TokenUsage};
use crate::conversation::{AssistantContent, Conversation};
use crate::registry::ToolRegistry;
use crate::tool::{ToolCall, ToolContext, ToolResult};

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Drives a chat model and the tool registry until the model answers
/// without requesting tools.
///
/// user -> model -> tool calls -> results -> model -> ... -> final text
pub struct AgenticLoop {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    max_iterations: usize,
    temperature: f32,
    max_tokens: u32,
}

/// What one user turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// Text of the final reply, if it had any.
    pub final_text: Option<String>,
    /// Usage reported for the final model call.
    pub last_usage: Option<TokenUsage>,
    /// Model calls made.
    pub iterations: usize,
    /// Names of the tools invoked, in call order.
    pub tools_used: Vec<String>,
}

impl AgenticLoop {
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            registry,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.model.provider_name()
    }

    /// Add `user_message` to `conversation` and run it to a final answer.
    ///
    /// Still requesting tools after `max_iterations` model calls is an error.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        user_message: &str,
        context: &ToolContext,
    ) -> Result<LoopOutcome, AgenticLoopError> {
        conversation.push_user(user_message);
        let tools = self.registry.definitions();
        let mut tools_used = Vec::new();

        for iteration in 1..=self.max_iterations {
            debug!(iteration, provider = self.model.provider_name(), "model call");
            let reply = self
                .model
                .respond(ChatRequest {
                    system_prompt: conversation.system_prompt(),
                    messages: conversation.messages(),
                    tools: &tools,
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                })
                .await?;

            if reply.stop_reason == StopReason::MaxTokens {
                warn!(iteration, "model reply truncated at max_tokens");
            }

            let calls = reply.tool_calls;
            conversation.push_assistant(AssistantContent {
                text: reply.text.clone(),
                tool_calls: calls.clone(),
            });

            if calls.is_empty() {
                info!(iterations = iteration, tools = tools_used.len(), "agent turn complete");
                return Ok(LoopOutcome {
                    final_text: reply.text,
                    last_usage: reply.usage,
                    iterations: iteration,
                    tools_used,
                });
            }

            tools_used.extend(calls.iter().map(|c| c.name.clone()));
            for result in self.execute_all(&calls, context).await {
                conversation.push_tool_result(result);
            }
        }

        Err(AgenticLoopError::MaxIterations(self.max_iterations))
    }

    /// Run every call concurrently. Failures become error results the model
    /// can read, in call order.
    async fn execute_all(&self, calls: &[ToolCall], context: &ToolContext) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.execute_one(call, context))).await
    }

    async fn execute_one(&self, call: &ToolCall, context: &ToolContext) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "model requested unknown tool");
            return ToolResult::error(&call.id, format!("Unknown tool: {}", call.name));
        };

        match tool.execute(call.input.clone(), context).await {
            Ok(result) => result.for_call(&call.id),
            Err(e) => {
                warn!(tool = %call.name, kind = %e.kind(), error = %e, "tool failed");
                ToolResult::error(&call.id, format!("Tool error: {e}"))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgenticLoopError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("no final answer after {0} model calls")]
    MaxIterations(usize),
}
