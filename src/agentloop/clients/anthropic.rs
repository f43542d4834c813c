//! Anthropic Messages adapter.
//!
//! Encoding lifts the system message out of the array into the top-level
//! `system` field and renders assistant turns that carry reasoning or tool
//! calls as ordered content blocks (`thinking`, `text`, then one `tool_use`
//! per call).  Tool-role messages travel back as user messages holding a
//! single `tool_result` block — the Messages API has no tool role.
//!
//! Anthropic surfaces a single identifier per `tool_use` block, which doubles
//! as both item and correlation ID; decoding stores it as the canonical
//! `call_id` and leaves the item-level `id` unset.

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

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u64 = 4096;

/// Client wrapper for the Anthropic Messages API.
pub struct AnthropicClient {
    core: ClientCore,
}

impl AnthropicClient {
    /// Create a client from the dispatcher configuration.
    pub fn new(config: &LLMConfig) -> Self {
        AnthropicClient {
            core: ClientCore::new(config, DEFAULT_BASE_URL),
        }
    }
}

/// Translate the canonical message list into the `system` field and the wire
/// `messages` array. Pure; never mutates its input.
pub fn encode_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system = None;
    let mut wire = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            Role::System => {
                if system.is_none() {
                    system = message.content.as_text().map(str::to_string);
                }
            }
            Role::User => {
                wire.push(json!({
                    "role": "user",
                    "content": encode_content(&message.content),
                }));
            }
            Role::Assistant => {
                if message.thinking.is_some() || message.tool_calls().is_some() {
                    let mut blocks = Vec::new();
                    if let Some(thinking) = &message.thinking {
                        blocks.push(json!({"type": "thinking", "thinking": thinking}));
                    }
                    match &message.content {
                        MessageContent::Text(text) if !text.is_empty() => {
                            blocks.push(json!({"type": "text", "text": text}));
                        }
                        MessageContent::Blocks(extra) => blocks.extend(extra.iter().cloned()),
                        _ => {}
                    }
                    for call in message.tool_calls().unwrap_or_default() {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.call_id,
                            "name": call.function.name,
                            "input": call.function.arguments,
                        }));
                    }
                    wire.push(json!({"role": "assistant", "content": blocks}));
                } else {
                    wire.push(json!({
                        "role": "assistant",
                        "content": encode_content(&message.content),
                    }));
                }
            }
            Role::Tool => {
                wire.push(json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": message.call_id.as_deref().unwrap_or_default(),
                        "content": encode_content(&message.content),
                    }],
                }));
            }
        }
    }

    (system, wire)
}

fn encode_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Blocks(blocks) => json!(blocks),
    }
}

/// Render tool declarations in the Messages `tools` shape.
pub fn encode_tools(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
    tools.iter().map(|tool| tool.to_anthropic_schema()).collect()
}

/// Decode a Messages API response into the canonical [`LLMResponse`].
pub fn decode_response(value: &Value) -> Result<LLMResponse, LlmError> {
    let blocks = value
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Protocol("Anthropic response missing content array".into()))?;

    let mut content = String::new();
    let mut thinking = String::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                content.push_str(block.get("text").and_then(Value::as_str).unwrap_or_default());
            }
            Some("thinking") => {
                thinking.push_str(
                    block
                        .get("thinking")
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                );
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LlmError::Protocol("tool_use block missing id".into()))?;
                let name = block
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LlmError::Protocol("tool_use block missing name".into()))?;
                tool_calls.push(ToolCall {
                    id: None,
                    call_id: id.to_string(),
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments: block.get("input").cloned().unwrap_or_else(|| json!({})),
                    },
                });
            }
            _ => {}
        }
    }

    let usage = value.get("usage").map(|usage| {
        let prompt = usage
            .get("input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let completion = usage
            .get("output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    });

    Ok(LLMResponse {
        content,
        thinking: if thinking.is_empty() {
            None
        } else {
            Some(thinking)
        },
        reasoning_items: None,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        finish_reason: value
            .get("stop_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
        usage,
        response_id: value.get("id").and_then(Value::as_str).map(str::to_string),
    })
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<LLMResponse, LlmError> {
        let (system, wire_messages) = encode_messages(messages);

        let mut body = json!({
            "model": self.core.model,
            "max_tokens": self.core.option_u64("max_tokens").unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": wire_messages,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
            body["tools"] = json!(encode_tools(tools));
        }

        let url = format!("{}/messages", self.core.base_url);
        let headers = [
            ("x-api-key", self.core.api_key.clone()),
            ("anthropic-version", API_VERSION.to_string()),
        ];
        let response = self.core.post_json(&url, &headers, &body).await?;
        decode_response(&response)
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
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
