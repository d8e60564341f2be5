use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConversationMessage {
    User(String),
    Assistant(AssistantContent),
    ToolResult(ToolResult),
}

impl ConversationMessage {
    /// One-line-per-part plain text, prefixed with the speaker.
    pub fn render(&self) -> String {
        match self {
            ConversationMessage::User(text) => format!("user: {text}"),
            ConversationMessage::Assistant(content) => {
                let calls = content
                    .tool_calls
                    .iter()
                    .map(|call| format!("call {}({})", call.name, call.input));
                let parts: Vec<String> = content.text.iter().cloned().chain(calls).collect();
                format!("assistant: {}", parts.join("\n"))
            }
            ConversationMessage::ToolResult(result) => format!("tool: {}", result.content),
        }
    }

    fn is_assistant(&self) -> bool {
        matches!(self, ConversationMessage::Assistant(_))
    }
}

/// Text and tool calls of one model reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantContent {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// The last model exchange: what the model was shown since its previous
/// reply, and what it answered.
#[derive(Debug, Clone, PartialEq)]
pub struct LastExchange {
    pub input: String,
    pub output: Option<String>,
}

/// Message history of one agent run.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    system_prompt: Option<String>,
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ConversationMessage::User(text.into()));
    }

    pub fn push_assistant(&mut self, content: AssistantContent) {
        self.messages.push(ConversationMessage::Assistant(content));
    }

    pub fn push_tool_result(&mut self, result: ToolResult) {
        self.messages.push(ConversationMessage::ToolResult(result));
    }

    /// Number of model replies so far.
    pub fn assistant_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.is_assistant()).count()
    }

    /// Final assistant message together with the user/tool messages that led
    /// up to it. `None` until the assistant has replied.
    pub fn last_exchange(&self) -> Option<LastExchange> {
        let last = self.messages.iter().rposition(ConversationMessage::is_assistant)?;
        let start = self.messages[..last]
            .iter()
            .rposition(ConversationMessage::is_assistant)
            .map_or(0, |i| i + 1);

        let input = self.messages[start..last]
            .iter()
            .map(ConversationMessage::render)
            .collect::<Vec<_>>()
            .join("\n");
        let output = match &self.messages[last] {
            ConversationMessage::Assistant(content) => content.text.clone(),
            _ => None,
        };
        Some(LastExchange { input, output })
    }
}
