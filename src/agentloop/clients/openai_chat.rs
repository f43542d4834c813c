//! OpenAI Chat Completions adapter.
//!
//! The most conventional of the four protocols: a flat `messages` array of
//! `{role, content, tool_calls?, tool_call_id?}` entries.  Tool-call
//! arguments are JSON-stringified on the way out and parsed on the way in,
//! and the single per-call `id` serves as both item and correlation ID.
//! Reasoning is not modeled by this wire format and round-trips as `None`.

use crate::agentloop::client_wrapper::{
    FunctionCall, LLMClient, LLMResponse, Message, MessageContent, Role, TokenUsage, ToolCall,
};
use crate::agentloop::clients::common::ClientCore;
use crate::agentloop::config::{LLMConfig, Provider};
use crate::agentloop::error::LlmError;
use crate::agentloop::retry::RetryCallback;
use crate::agentloop::tool_protocol::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client wrapper for the Chat Completions endpoint.
pub struct OpenAIChatClient {
    core: ClientCore,
}

impl OpenAIChatClient {
    /// Create a client from the dispatcher configuration.
    pub fn new(config: &LLMConfig) -> Self {
        OpenAIChatClient {
            core: ClientCore::new(config, DEFAULT_BASE_URL),
        }
    }
}

/// Translate the canonical message list into the wire `messages` array.
/// Pure; never mutates its input.
pub fn encode_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match message.role {
            Role::System => json!({
                "role": "system",
                "content": encode_content(&message.content),
            }),
            Role::User => json!({
                "role": "user",
                "content": encode_content(&message.content),
            }),
            Role::Assistant => match message.tool_calls() {
                Some(calls) => {
                    let tool_calls: Vec<Value> = calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.call_id,
                                "type": "function",
                                "function": {
                                    "name": call.function.name,
                                    "arguments": serde_json::to_string(&call.function.arguments)
                                        .unwrap_or_else(|_| "{}".to_string()),
                                },
                            })
                        })
                        .collect();
                    let content = match message.content.as_text() {
                        Some(text) if !text.is_empty() => json!(text),
                        _ => Value::Null,
                    };
                    json!({
                        "role": "assistant",
                        "content": content,
                        "tool_calls": tool_calls,
                    })
                }
                None => json!({
                    "role": "assistant",
                    "content": encode_content(&message.content),
                }),
            },
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": message.call_id.as_deref().unwrap_or_default(),
                "content": encode_content(&message.content),
            }),
        })
        .collect()
}

fn encode_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Blocks(blocks) => json!(blocks),
    }
}

/// Render tool declarations in the nested `function` shape.
pub fn encode_tools(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
    tools.iter().map(|tool| tool.to_openai_schema()).collect()
}

/// Decode a Chat Completions response into the canonical [`LLMResponse`].
///
/// Malformed tool-call argument JSON propagates as an error; the loop does
/// not mask protocol violations.
pub fn decode_response(value: &Value) -> Result<LLMResponse, LlmError> {
    let message = value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| LlmError::Protocol("Chat Completions response has no choices".into()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in calls {
            // Tool calls of any type other than "function" are ignored.
            if call.get("type").and_then(Value::as_str) != Some("function") {
                continue;
            }
            let id = call
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| LlmError::Protocol("tool call missing id".into()))?;
            let function = call
                .get("function")
                .ok_or_else(|| LlmError::Protocol("tool call missing function".into()))?;
            let name = function
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| LlmError::Protocol("tool call missing function name".into()))?;
            let arguments: Value = serde_json::from_str(
                function
                    .get("arguments")
                    .and_then(Value::as_str)
                    .unwrap_or("{}"),
            )?;
            tool_calls.push(ToolCall {
                id: None,
                call_id: id.to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments,
                },
            });
        }
    }

    let usage = value.get("usage").map(|usage| TokenUsage {
        prompt_tokens: usage
            .get("prompt_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize,
        completion_tokens: usage
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize,
        total_tokens: usage
            .get("total_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize,
    });

    Ok(LLMResponse {
        content,
        thinking: None,
        reasoning_items: None,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        finish_reason: value
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("finish_reason"))
            .and_then(Value::as_str)
            .map(str::to_string),
        usage,
        response_id: value.get("id").and_then(Value::as_str).map(str::to_string),
    })
}

#[async_trait]
impl LLMClient for OpenAIChatClient {
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<LLMResponse, LlmError> {
        let mut body = json!({
            "model": self.core.model,
            "messages": encode_messages(messages),
        });
        if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
            body["tools"] = json!(encode_tools(tools));
        }

        let url = format!("{}/chat/completions", self.core.base_url);
        let headers = [(
            "Authorization",
            format!("Bearer {}", self.core.api_key),
        )];
        let response = self.core.post_json(&url, &headers, &body).await?;
        decode_response(&response)
    }

    fn provider(&self) -> Provider {
        Provider::OpenAIChat
    }

    fn api_base_url(&self) -> &str {
        &self.core.base_url
    }

    fn model(&self) -> &str {
        &self.core.model
    }

    fn set_retry_callback(&self, callback: Option<RetryCallback>) {
        self.core.set_retry_callback(callback);
    }
}
