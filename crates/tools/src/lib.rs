//! Tool contract, agentic loop and the built-in financial tools.

pub mod chat;
pub mod conversation;
pub mod document;
mod http;
pub mod model;
pub mod registry;
pub mod runtime;
pub mod similarity;
pub mod splitter;
pub mod tool;
pub mod tools;

pub use chat::{ChatModel, ChatRequest, LlmError, ModelReply, StopReason, TokenUsage};
pub use conversation::{AssistantContent, Conversation, ConversationMessage, LastExchange};
pub use model::{ModelError, TextModel};
pub use registry::{RegistryError, ToolRegistry};
pub use runtime::{AgenticLoop, AgenticLoopError, LoopOutcome};
pub use tool::{Tool, ToolCall, ToolContext, ToolDefinition, ToolError, ToolResult};
pub use tools::{
    ContractAnalyzerTool, CurrencyConversionTool, NewsTool, RegulationSearchTool, SortBy, TimeTool,
};
