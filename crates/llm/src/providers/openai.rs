//! OpenAI-compatible chat completions (`/v1/chat/completions`).
//!
//! One client serves the document tools ([`TextModel`]) and the agentic loop
//! ([`ChatModel`]). Requests are non-streaming.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use finagent_tools::{
    AssistantContent, ChatModel, ChatRequest, ConversationMessage, LlmError, ModelError,
    ModelReply, StopReason, TextModel, TokenUsage, ToolCall, ToolDefinition,
};

/// Fallback when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: 0.1,
            max_tokens: 2048,
        }
    }

    /// Sampling used for plain [`TextModel`] completions.
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, body: &Value) -> Result<Value, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, url = %url, "chat completion request");

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::AuthError,
                429 => LlmError::RateLimited {
                    retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
                },
                code => LlmError::ApiError {
                    status: code,
                    message,
                },
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn chat_body(&self, request: &ChatRequest<'_>) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.extend(request.messages.iter().map(message_to_openai));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(tool_to_openai).collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }
}

// ── Wire translation ──────────────────────────────────────────

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

fn message_to_openai(msg: &ConversationMessage) -> Value {
    match msg {
        ConversationMessage::User(text) => json!({"role": "user", "content": text}),
        ConversationMessage::Assistant(content) => assistant_to_openai(content),
        ConversationMessage::ToolResult(result) => json!({
            "role": "tool",
            "tool_call_id": result.tool_call_id,
            "content": result.content,
        }),
    }
}

fn assistant_to_openai(content: &AssistantContent) -> Value {
    let mut message = json!({"role": "assistant", "content": content.text});
    if !content.tool_calls.is_empty() {
        message["tool_calls"] = content
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {"name": call.name, "arguments": call.input.to_string()},
                })
            })
            .collect();
    }
    message
}

/// Empty arguments mean "no arguments". Malformed JSON becomes `null` so the
/// tool rejects it and the model sees why.
fn parse_arguments(tool: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(tool, error = %e, "tool call arguments are not valid JSON");
        Value::Null
    })
}

fn reply_from_openai(resp: &Value) -> Result<ModelReply, LlmError> {
    let choice = &resp["choices"][0];
    let message = choice
        .get("message")
        .filter(|m| m.is_object())
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message".into()))?;

    let text = message["content"]
        .as_str()
        .filter(|t| !t.is_empty())
        .map(String::from);

    let mut tool_calls = Vec::new();
    for call in message["tool_calls"].as_array().into_iter().flatten() {
        let name = call["function"]["name"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("tool call without a name".into()))?;
        tool_calls.push(ToolCall {
            id: call["id"].as_str().unwrap_or_default().to_string(),
            name: name.to_string(),
            input: parse_arguments(name, call["function"]["arguments"].as_str().unwrap_or("")),
        });
    }

    let usage = resp
        .get("usage")
        .filter(|u| u.is_object())
        .map(|u| TokenUsage {
            input_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
            output_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        });

    Ok(ModelReply {
        text,
        tool_calls,
        usage,
        stop_reason: StopReason::from_finish_reason(choice["finish_reason"].as_str()),
    })
}

// ── Trait implementations ─────────────────────────────────────

#[async_trait]
impl ChatModel for OpenAiCompatProvider {
    async fn respond(&self, request: ChatRequest<'_>) -> Result<ModelReply, LlmError> {
        let resp = self.post(&self.chat_body(&request)).await?;
        reply_from_openai(&resp)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[async_trait]
impl TextModel for OpenAiCompatProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let resp = self.post(&body).await.map_err(|e| ModelError(e.to_string()))?;
        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                ModelError(
                    LlmError::InvalidResponse("missing choices[0].message.content".into())
                        .to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finagent_tools::ToolResult;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("sk-test".to_string(), "gpt-test".to_string(), server.uri())
    }

    fn time_tool() -> ToolDefinition {
        ToolDefinition {
            name: "time_tool".to_string(),
            description: "Current time".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    fn request<'a>(
        messages: &'a [ConversationMessage],
        tools: &'a [ToolDefinition],
    ) -> ChatRequest<'a> {
        ChatRequest {
            system_prompt: None,
            messages,
            tools,
            temperature: 0.0,
            max_tokens: 16,
        }
    }

    #[test]
    fn tool_definition_becomes_function() {
        let v = tool_to_openai(&time_tool());
        assert_eq!(v["type"], "function");
        assert_eq!(v["function"]["name"], "time_tool");
        assert_eq!(v["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn assistant_tool_calls_carry_string_arguments() {
        let msg = ConversationMessage::Assistant(AssistantContent {
            text: None,
            tool_calls: vec![ToolCall {
                id: "call_9".to_string(),
                name: "currency_converter".to_string(),
                input: json!({"base_currency": "USD"}),
            }],
        });
        let v = message_to_openai(&msg);
        assert_eq!(v["role"], "assistant");
        assert!(v["content"].is_null());
        assert_eq!(v["tool_calls"][0]["id"], "call_9");
        assert_eq!(
            v["tool_calls"][0]["function"]["arguments"],
            r#"{"base_currency":"USD"}"#
        );
    }

    #[test]
    fn tool_result_uses_tool_role() {
        let msg = ConversationMessage::ToolResult(ToolResult::text("92.0").for_call("call_9"));
        let v = message_to_openai(&msg);
        assert_eq!(v["role"], "tool");
        assert_eq!(v["tool_call_id"], "call_9");
        assert_eq!(v["content"], "92.0");
    }

    #[test]
    fn reply_with_tool_calls_and_usage() {
        let resp = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function",
                         "function": {"name": "time_tool", "arguments": "{\"time_zone\":\"Asia/Tokyo\"}"}},
                        {"id": "call_2", "type": "function",
                         "function": {"name": "time_tool", "arguments": ""}},
                        {"id": "call_3", "type": "function",
                         "function": {"name": "time_tool", "arguments": "{oops"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 50, "completion_tokens": 7, "total_tokens": 57}
        });
        let reply = reply_from_openai(&resp).unwrap();
        assert_eq!(reply.text, None);
        assert_eq!(reply.stop_reason, StopReason::ToolUse);
        assert_eq!(
            reply.usage,
            Some(TokenUsage {
                input_tokens: 50,
                output_tokens: 7
            })
        );
        assert_eq!(reply.tool_calls.len(), 3);
        assert_eq!(reply.tool_calls[0].input, json!({"time_zone": "Asia/Tokyo"}));
        assert_eq!(reply.tool_calls[1].input, json!({}));
        assert_eq!(reply.tool_calls[2].input, Value::Null);
    }

    #[test]
    fn reply_without_message_is_invalid() {
        let err = reply_from_openai(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn text_model_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "messages": [{"role": "user", "content": "Summarize"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Summary."}, "finish_reason": "stop"}]
            })))
            .mount(&server)
            .await;

        let answer = provider(&server).complete("Summarize").await.unwrap();
        assert_eq!(answer, "Summary.");
    }

    #[tokio::test]
    async fn tools_and_system_prompt_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "Time in Tokyo?"}
                ],
                "tools": [{"type": "function", "function": {"name": "time_tool"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Noon."}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 20, "completion_tokens": 2}
            })))
            .mount(&server)
            .await;

        let messages = vec![ConversationMessage::User("Time in Tokyo?".to_string())];
        let tools = vec![time_tool()];
        let mut req = request(&messages, &tools);
        req.system_prompt = Some("Be brief.");

        let reply = provider(&server).respond(req).await.unwrap();
        assert_eq!(reply.text.as_deref(), Some("Noon."));
        assert_eq!(reply.stop_reason, StopReason::EndTurn);
        assert_eq!(reply.usage.map(|u| u.output_tokens), Some(2));
    }

    #[tokio::test]
    async fn error_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider(&server).respond(request(&[], &[])).await.unwrap_err();
        match err {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_uses_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = provider(&server).respond(request(&[], &[])).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { retry_after_secs: 7 }));
    }

    #[tokio::test]
    async fn unauthorized_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = provider(&server).respond(request(&[], &[])).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthError));
    }

    #[tokio::test]
    async fn missing_content_is_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server).complete("hi").await.unwrap_err();
        assert!(err.to_string().contains("Invalid response"));
    }
}
