//! Chat model seam used by the agentic loop.
//!
//! One request carries the whole conversation and the tool definitions; one
//! [`ModelReply`] comes back with text, requested tool calls and usage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationMessage;
use crate::tool::{ToolCall, ToolDefinition};

/// Why the model stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    ContentFilter,
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason`.
    pub fn from_finish_reason(reason: Option<&str>) -> Self {
        match reason {
            Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            Some("content_filter") => StopReason::ContentFilter,
            _ => StopReason::EndTurn,
        }
    }
}

/// Provider-reported token counts for one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
    pub stop_reason: StopReason,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            usage: None,
            stop_reason: StopReason::EndTurn,
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls: calls,
            usage: None,
            stop_reason: StopReason::ToolUse,
        }
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.usage = Some(TokenUsage {
            input_tokens,
            output_tokens,
        });
        self
    }
}

/// Everything the model sees for one call.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system_prompt: Option<&'a str>,
    pub messages: &'a [ConversationMessage],
    pub tools: &'a [ToolDefinition],
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A chat model that can request tool calls. Implementations live in
/// `finagent-llm`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn respond(&self, request: ChatRequest<'_>) -> Result<ModelReply, LlmError>;

    /// Short provider label for logs.
    fn provider_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Authentication failed")]
    AuthError,
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

/// Scripted chat model for loop tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies in queue order and records every conversation it was sent.
    /// An empty queue answers with an empty end-of-turn reply.
    #[derive(Default)]
    pub struct ScriptedChatModel {
        replies: Mutex<VecDeque<Result<ModelReply, String>>>,
        requests: Mutex<Vec<Vec<ConversationMessage>>>,
    }

    impl ScriptedChatModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn queue(&self, reply: ModelReply) {
            self.replies.lock().unwrap().push_back(Ok(reply));
        }

        pub fn queue_text(&self, text: &str) {
            self.queue(ModelReply::text(text));
        }

        pub fn queue_text_with_usage(&self, text: &str, input_tokens: u64, output_tokens: u64) {
            self.queue(ModelReply::text(text).with_usage(input_tokens, output_tokens));
        }

        pub fn queue_tool_call(&self, id: &str, name: &str, input: serde_json::Value) {
            self.queue(ModelReply::tool_calls(vec![ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }]));
        }

        /// Next call fails with a 500.
        pub fn queue_error(&self, message: &str) {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
        }

        pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChatModel {
        async fn respond(&self, request: ChatRequest<'_>) -> Result<ModelReply, LlmError> {
            self.requests.lock().unwrap().push(request.messages.to_vec());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(LlmError::ApiError {
                    status: 500,
                    message,
                }),
                None => Ok(ModelReply {
                    text: None,
                    tool_calls: Vec::new(),
                    usage: None,
                    stop_reason: StopReason::EndTurn,
                }),
            }
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }
    }
}
