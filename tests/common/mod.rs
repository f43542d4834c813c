//! Scripted provider client shared by the behavioural test suites.

#![allow(dead_code)]

use agentloop::{
    FunctionCall, LLMClient, LLMResponse, LlmError, Message, Provider, TokenUsage, ToolCall,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Route `log` output through the test harness when `RUST_LOG` is set.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type ScriptStep = Box<dyn FnOnce(&[Message]) -> Result<LLMResponse, LlmError> + Send>;

/// An [`LLMClient`] that replays a queue of scripted responses and records
/// every request it receives.
pub struct ScriptedClient {
    script: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(ScriptedClient {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Queue an arbitrary step with access to the incoming message list.
    pub fn push(
        self: &Arc<Self>,
        step: impl FnOnce(&[Message]) -> Result<LLMResponse, LlmError> + Send + 'static,
    ) {
        self.script.lock().unwrap().push_back(Box::new(step));
    }

    /// Queue a fixed response.
    pub fn respond(self: &Arc<Self>, response: LLMResponse) {
        self.push(move |_| Ok(response));
    }

    /// Queue a plain-text final answer.
    pub fn respond_text(self: &Arc<Self>, content: &str) {
        self.respond(text_response(content));
    }

    /// Queue an error.
    pub fn respond_err(self: &Arc<Self>, err: LlmError) {
        self.push(move |_| Err(err));
    }

    /// Number of `generate` calls observed so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Snapshot of the message list sent with request `index`.
    pub fn request(&self, index: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(
        &self,
        messages: &[Message],
        _tools: Option<&[Arc<dyn agentloop::Tool>]>,
    ) -> Result<LLMResponse, LlmError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted client ran out of responses");
        step(messages)
    }

    fn provider(&self) -> Provider {
        Provider::OpenAIChat
    }

    fn api_base_url(&self) -> &str {
        "mock://llm"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// A final text turn with token usage.
pub fn text_response(content: &str) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        usage: Some(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        finish_reason: Some("stop".to_string()),
        ..Default::default()
    }
}

/// A turn requesting a single tool call.
pub fn tool_call_response(call_id: &str, name: &str, arguments: Value) -> LLMResponse {
    LLMResponse {
        tool_calls: Some(vec![ToolCall {
            id: None,
            call_id: call_id.to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments,
            },
        }]),
        finish_reason: Some("tool_calls".to_string()),
        ..Default::default()
    }
}
