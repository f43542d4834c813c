//! OpenAI Responses adapter.
//!
//! Structurally the furthest from the canonical model: the wire carries a
//! flat sequence of typed **items** (`reasoning`, `message`, `function_call`,
//! `function_call_output`) instead of role-tagged turns, and the system
//! message becomes the top-level `instructions` parameter.
//!
//! A single canonical assistant message expands into multiple items, in this
//! order: one `reasoning` item per retained
//! [`ReasoningItem`](crate::agentloop::client_wrapper::ReasoningItem), one
//! `function_call` item per tool call (with both the item `id` and the
//! correlation `call_id` populated and arguments JSON-stringified), then an
//! assistant `message` item when the turn had text.  This is the one protocol
//! that distinguishes item IDs from correlation IDs, which is why the
//! canonical `ToolCall` carries both.

use crate::agentloop::client_wrapper::{
    FunctionCall, LLMClient, LLMResponse, Message, MessageContent, ReasoningItem, Role, TokenUsage,
    ToolCall,
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

/// Client wrapper for the Responses endpoint.
pub struct OpenAIResponsesClient {
    core: ClientCore,
}

impl OpenAIResponsesClient {
    /// Create a client from the dispatcher configuration.
    pub fn new(config: &LLMConfig) -> Self {
        OpenAIResponsesClient {
            core: ClientCore::new(config, DEFAULT_BASE_URL),
        }
    }
}

/// Translate the canonical message list into the `instructions` parameter and
/// the flat `input` item sequence. Pure; never mutates its input.
pub fn encode_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut instructions = None;
    let mut input = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {
                if instructions.is_none() {
                    instructions = message.content.as_text().map(str::to_string);
                }
            }
            Role::User => {
                input.push(json!({
                    "type": "message",
                    "role": "user",
                    "content": encode_content(&message.content),
                }));
            }
            Role::Assistant => {
                for item in message.reasoning_items.as_deref().unwrap_or_default() {
                    input.push(json!({
                        "type": "reasoning",
                        "id": item.id,
                        "summary": [{"type": "summary_text", "text": item.summary}],
                    }));
                }
                for call in message.tool_calls().unwrap_or_default() {
                    let mut wire_call = json!({
                        "type": "function_call",
                        "call_id": call.call_id,
                        "name": call.function.name,
                        "arguments": serde_json::to_string(&call.function.arguments)
                            .unwrap_or_else(|_| "{}".to_string()),
                    });
                    if let Some(id) = &call.id {
                        wire_call["id"] = json!(id);
                    }
                    input.push(wire_call);
                }
                match &message.content {
                    MessageContent::Text(text) if !text.is_empty() => {
                        input.push(json!({
                            "type": "message",
                            "role": "assistant",
                            "content": [{"type": "output_text", "text": text}],
                        }));
                    }
                    MessageContent::Blocks(blocks) if !blocks.is_empty() => {
                        input.push(json!({
                            "type": "message",
                            "role": "assistant",
                            "content": blocks,
                        }));
                    }
                    _ => {}
                }
            }
            Role::Tool => {
                input.push(json!({
                    "type": "function_call_output",
                    "call_id": message.call_id.as_deref().unwrap_or_default(),
                    "output": encode_content(&message.content),
                }));
            }
        }
    }

    (instructions, input)
}

fn encode_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Blocks(blocks) => json!(blocks),
    }
}

/// Render tool declarations in the flat Responses shape.
pub fn encode_tools(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
    tools.iter().map(|tool| tool.to_responses_schema()).collect()
}

/// Decode a Responses API reply into the canonical [`LLMResponse`].
pub fn decode_response(value: &Value) -> Result<LLMResponse, LlmError> {
    let output = value
        .get("output")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Protocol("Responses reply missing output array".into()))?;

    let mut content = String::new();
    let mut thinking = String::new();
    let mut reasoning_items = Vec::new();
    let mut tool_calls = Vec::new();

    for item in output {
        match item.get("type").and_then(Value::as_str) {
            Some("message") => {
                if let Some(parts) = item.get("content").and_then(Value::as_array) {
                    for part in parts {
                        if part.get("type").and_then(Value::as_str) == Some("output_text") {
                            content.push_str(
                                part.get("text").and_then(Value::as_str).unwrap_or_default(),
                            );
                        }
                    }
                }
            }
            Some("reasoning") => {
                let id = item
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LlmError::Protocol("reasoning item missing id".into()))?;
                let mut summary = String::new();
                if let Some(parts) = item.get("summary").and_then(Value::as_array) {
                    for part in parts {
                        if part.get("type").and_then(Value::as_str) == Some("summary_text") {
                            summary.push_str(
                                part.get("text").and_then(Value::as_str).unwrap_or_default(),
                            );
                        }
                    }
                }
                thinking.push_str(&summary);
                reasoning_items.push(ReasoningItem {
                    id: id.to_string(),
                    summary,
                });
            }
            Some("function_call") => {
                let call_id = item
                    .get("call_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LlmError::Protocol("function_call missing call_id".into()))?;
                let name = item
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LlmError::Protocol("function_call missing name".into()))?;
                let arguments: Value = serde_json::from_str(
                    item.get("arguments").and_then(Value::as_str).unwrap_or("{}"),
                )?;
                tool_calls.push(ToolCall {
                    id: item.get("id").and_then(Value::as_str).map(str::to_string),
                    call_id: call_id.to_string(),
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments,
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
            total_tokens: usage
                .get("total_tokens")
                .and_then(Value::as_u64)
                .unwrap_or((prompt + completion) as u64) as usize,
        }
    });

    Ok(LLMResponse {
        content,
        thinking: if thinking.is_empty() {
            None
        } else {
            Some(thinking)
        },
        reasoning_items: if reasoning_items.is_empty() {
            None
        } else {
            Some(reasoning_items)
        },
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        finish_reason: value
            .get("status")
            .and_then(Value::as_str)
            .map(map_status),
        usage,
        response_id: value.get("id").and_then(Value::as_str).map(str::to_string),
    })
}

/// Map a Responses status onto the canonical finish reason.
fn map_status(status: &str) -> String {
    match status {
        "completed" => "stop",
        "incomplete" => "length",
        "failed" => "error",
        "cancelled" => "cancelled",
        other => other,
    }
    .to_string()
}

#[async_trait]
impl LLMClient for OpenAIResponsesClient {
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<LLMResponse, LlmError> {
        let (instructions, input) = encode_messages(messages);

        let mut body = json!({
            "model": self.core.model,
            "input": input,
        });
        if let Some(instructions) = instructions {
            body["instructions"] = json!(instructions);
        }
        if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
            body["tools"] = json!(encode_tools(tools));
        }

        let url = format!("{}/responses", self.core.base_url);
        let headers = [(
            "Authorization",
            format!("Bearer {}", self.core.api_key),
        )];
        let response = self.core.post_json(&url, &headers, &body).await?;
        decode_response(&response)
    }

    fn provider(&self) -> Provider {
        Provider::OpenAIResponses
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
