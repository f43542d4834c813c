//! Google Gemini (Generative Language) adapter.
//!
//! The system message is lifted into the top-level `systemInstruction`, the
//! canonical assistant role maps to the wire role `model`, and both the user
//! and tool roles map to the wire role `user` — tool results travel as
//! `functionResponse` parts.  Tool calls are `functionCall` parts carrying
//! the parsed argument mapping directly (no JSON string), and reasoning text
//! is a text part flagged `thought: true` in both directions.
//!
//! Gemini may omit the function-call ID entirely; decoding then synthesizes a
//! stable `gemini_call_{timestamp}_{part_index}` fallback so the correlation
//! invariant with the subsequent tool-role message still holds.  The API key
//! travels as a `key` query parameter rather than an auth header.

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

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client wrapper for Gemini `generateContent` endpoints.
pub struct GeminiClient {
    core: ClientCore,
}

impl GeminiClient {
    /// Create a client from the dispatcher configuration.
    pub fn new(config: &LLMConfig) -> Self {
        GeminiClient {
            core: ClientCore::new(config, DEFAULT_BASE_URL),
        }
    }
}

/// Translate the canonical message list into the `systemInstruction` field
/// and the wire `contents` array. Pure; never mutates its input.
pub fn encode_messages(messages: &[Message]) -> (Option<Value>, Vec<Value>) {
    let mut system_instruction = None;
    let mut contents = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {
                if system_instruction.is_none() {
                    let text = message.content.as_text().unwrap_or_default();
                    system_instruction = Some(json!({"parts": [{"text": text}]}));
                }
            }
            Role::User => {
                let parts = match &message.content {
                    MessageContent::Text(text) => vec![json!({"text": text})],
                    MessageContent::Blocks(blocks) => blocks.clone(),
                };
                contents.push(json!({"role": "user", "parts": parts}));
            }
            Role::Assistant => {
                let mut parts = Vec::new();
                if let Some(thinking) = &message.thinking {
                    parts.push(json!({"text": thinking, "thought": true}));
                }
                match &message.content {
                    MessageContent::Text(text) if !text.is_empty() => {
                        parts.push(json!({"text": text}));
                    }
                    MessageContent::Blocks(blocks) => parts.extend(blocks.iter().cloned()),
                    _ => {}
                }
                for call in message.tool_calls().unwrap_or_default() {
                    parts.push(json!({
                        "functionCall": {
                            "name": call.function.name,
                            "args": call.function.arguments,
                            "id": call.call_id,
                        },
                    }));
                }
                if parts.is_empty() {
                    // Empty parts arrays are rejected by the wire format.
                    parts.push(json!({"text": ""}));
                }
                contents.push(json!({"role": "model", "parts": parts}));
            }
            Role::Tool => {
                let text = message.content.as_text().unwrap_or_default();
                contents.push(json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": {
                            "id": message.call_id.as_deref().unwrap_or_default(),
                            "name": message.name.as_deref().unwrap_or_default(),
                            "response": {"result": text},
                        },
                    }],
                }));
            }
        }
    }

    (system_instruction, contents)
}

/// Render tool declarations in the `functionDeclarations` shape.
pub fn encode_tools(tools: &[Arc<dyn Tool>]) -> Value {
    let declarations: Vec<Value> = tools.iter().map(|tool| tool.to_gemini_schema()).collect();
    json!([{"functionDeclarations": declarations}])
}

/// Decode a `generateContent` reply into the canonical [`LLMResponse`].
pub fn decode_response(value: &Value) -> Result<LLMResponse, LlmError> {
    let candidate = value
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .ok_or_else(|| LlmError::Protocol("Gemini response has no candidates".into()))?;

    let mut content = String::new();
    let mut thinking = String::new();
    let mut tool_calls = Vec::new();

    if let Some(parts) = candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
    {
        for (index, part) in parts.iter().enumerate() {
            if let Some(call) = part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LlmError::Protocol("functionCall missing name".into()))?;
                let call_id = call
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| synthesize_call_id(index));
                tool_calls.push(ToolCall {
                    id: None,
                    call_id,
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments: call.get("args").cloned().unwrap_or_else(|| json!({})),
                    },
                });
            } else if let Some(text) = part.get("text").and_then(Value::as_str) {
                if part.get("thought").and_then(Value::as_bool).unwrap_or(false) {
                    thinking.push_str(text);
                } else {
                    content.push_str(text);
                }
            }
        }
    }

    let usage = value.get("usageMetadata").map(|usage| {
        let prompt = usage
            .get("promptTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let completion = usage
            .get("candidatesTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: usage
                .get("totalTokenCount")
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
        reasoning_items: None,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        finish_reason: candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .map(|reason| reason.to_ascii_lowercase()),
        usage,
        response_id: value
            .get("responseId")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Stable fallback ID for responses that omit one.
fn synthesize_call_id(part_index: usize) -> String {
    format!(
        "gemini_call_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        part_index
    )
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<LLMResponse, LlmError> {
        let (system_instruction, contents) = encode_messages(messages);

        let mut body = json!({"contents": contents});
        if let Some(system_instruction) = system_instruction {
            body["systemInstruction"] = system_instruction;
        }
        if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
            body["tools"] = encode_tools(tools);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.core.base_url, self.core.model, self.core.api_key
        );
        let response = self.core.post_json(&url, &[], &body).await?;
        decode_response(&response)
    }

    fn provider(&self) -> Provider {
        Provider::Gemini
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
