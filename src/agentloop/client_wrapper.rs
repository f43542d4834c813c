//! Provider-agnostic message model and the [`LLMClient`] trait.
//!
//! The types in this module are the lingua franca that lets four otherwise
//! incompatible wire protocols (Anthropic Messages, OpenAI Responses, OpenAI
//! Chat Completions, Google Gemini) be interchanged behind one agent loop.
//! Every field is plain data so the provider adapters in
//! [`clients`](crate::agentloop::clients) can pattern-match freely; the model
//! carries no behaviour beyond construction.
//!
//! # Building a conversation
//!
//! ```rust
//! use agentloop::{Message, Role};
//!
//! let mut messages = vec![
//!     Message::system("You are a weather assistant."),
//!     Message::user("What's the weather in Paris?"),
//! ];
//! messages.push(Message::assistant("Let me check that for you."));
//!
//! assert!(matches!(messages[0].role, Role::System));
//! assert_eq!(messages[1].content.as_text(), Some("What's the weather in Paris?"));
//! ```
//!
//! # Correlation identifiers
//!
//! A [`ToolCall`] always carries a `call_id` that pairs the assistant's tool
//! invocation with the tool-role [`Message`] holding its result.  The optional
//! `id` is a distinct *item* identifier that only the OpenAI Responses
//! protocol surfaces; the other three providers collapse both into one value.

use crate::agentloop::error::LlmError;
use crate::agentloop::retry::RetryCallback;
use crate::agentloop::tool_protocol::Tool;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Represents the possible roles for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A system authored message that primes or constrains assistant behaviour.
    System,
    /// A user authored message (or a synthetic one such as the context summary).
    User,
    /// An assistant authored message, possibly carrying reasoning and tool calls.
    Assistant,
    /// A tool-result message correlating with a prior assistant [`ToolCall`].
    Tool,
}

/// Message body: either plain text or an ordered sequence of opaque content
/// blocks that the adapters forward to the wire unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    /// Plain text body. The common case.
    Text(String),
    /// Provider-shaped content blocks, kept opaque to the core.
    Blocks(Vec<serde_json::Value>),
}

impl MessageContent {
    /// Borrow the text body, or `None` for block content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text.as_str()),
            MessageContent::Blocks(_) => None,
        }
    }

    /// True when there is nothing to transmit.
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.is_empty(),
            MessageContent::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// One reasoning block as surfaced by providers that identify them.
///
/// The OpenAI Responses protocol requires reasoning item IDs to be echoed back
/// on the next request, so decoded responses retain them here in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningItem {
    /// Provider-assigned block identifier.
    pub id: String,
    /// Human-readable reasoning summary for this block.
    pub summary: String,
}

/// The `name`/`arguments` pair inside a [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    /// Tool name matching one of the [`Tool`]s sent with the request.
    pub name: String,
    /// Parsed JSON arguments. Always a mapping, never a serialized string.
    pub arguments: serde_json::Value,
}

/// A single tool call requested by the LLM.
///
/// The wire `type` of every call is `"function"`; calls of any other type are
/// dropped during decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    /// Item identifier, distinct from `call_id`.  Only populated by providers
    /// that surface two IDs (OpenAI Responses).
    pub id: Option<String>,
    /// Correlation identifier pairing this call with the tool-role message
    /// that carries its result. Required for every provider.
    pub call_id: String,
    /// The function being invoked.
    pub function: FunctionCall,
}

impl ToolCall {
    /// Build a call with a bare correlation ID, the shape three of the four
    /// providers use.
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        ToolCall {
            id: None,
            call_id: call_id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }
}

/// The canonical unit of conversation.
///
/// Messages are immutable once appended to an agent's history; the agent only
/// ever rewrites the list as a whole (summarization, cancellation cleanup).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The message body.
    pub content: MessageContent,
    /// Concatenated reasoning text, kept for display only.
    pub thinking: Option<String>,
    /// Identified reasoning blocks retained for providers that require them
    /// to round-trip (see [`ReasoningItem`]).
    pub reasoning_items: Option<Vec<ReasoningItem>>,
    /// Tool calls requested by an assistant message. `None` when absent —
    /// never an empty vector, so "did the turn finish?" is a single check.
    pub tool_calls: Option<Vec<ToolCall>>,
    /// On tool-role messages, the correlation ID of the originating call.
    pub call_id: Option<String>,
    /// On tool-role messages, the name of the tool that produced the result.
    pub name: Option<String>,
}

impl Message {
    /// Construct a system message.
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Message {
            role: Role::System,
            content: content.into(),
            thinking: None,
            reasoning_items: None,
            tool_calls: None,
            call_id: None,
            name: None,
        }
    }

    /// Construct a user message.
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
            thinking: None,
            reasoning_items: None,
            tool_calls: None,
            call_id: None,
            name: None,
        }
    }

    /// Construct a plain-text assistant message without reasoning or calls.
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Message::assistant_turn(content, None, None, None)
    }

    /// Construct a full assistant turn as decoded from a provider response.
    pub fn assistant_turn(
        content: impl Into<MessageContent>,
        thinking: Option<String>,
        reasoning_items: Option<Vec<ReasoningItem>>,
        tool_calls: Option<Vec<ToolCall>>,
    ) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
            thinking,
            reasoning_items,
            tool_calls: tool_calls.filter(|calls| !calls.is_empty()),
            call_id: None,
            name: None,
        }
    }

    /// Construct a tool-result message correlated by `call_id`.
    pub fn tool(
        name: impl Into<String>,
        call_id: impl Into<String>,
        content: impl Into<MessageContent>,
    ) -> Self {
        Message {
            role: Role::Tool,
            content: content.into(),
            thinking: None,
            reasoning_items: None,
            tool_calls: None,
            call_id: Some(call_id.into()),
            name: Some(name.into()),
        }
    }

    /// Non-empty tool calls on this message, if any.
    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        self.tool_calls.as_deref().filter(|calls| !calls.is_empty())
    }
}

/// How many tokens were spent on prompt vs. completion?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUsage {
    /// Number of prompt/input tokens billed by the provider.
    pub prompt_tokens: usize,
    /// Number of generated/output tokens billed by the provider.
    pub completion_tokens: usize,
    /// Convenience total equal to `prompt_tokens + completion_tokens`.
    pub total_tokens: usize,
}

/// Canonical decoded model output, identical in shape for all four providers.
///
/// Absent fields are `None`; decoders never leave a field unset or fabricate
/// placeholder values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LLMResponse {
    /// Concatenated assistant text.
    pub content: String,
    /// Concatenated reasoning text, when the provider surfaced any.
    pub thinking: Option<String>,
    /// Identified reasoning blocks, preserved for round-trip.
    pub reasoning_items: Option<Vec<ReasoningItem>>,
    /// Tool calls requested by the model. `None` when the turn is final.
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Provider finish reason, normalized per adapter. Advisory only.
    pub finish_reason: Option<String>,
    /// Token accounting, when the provider reported it.
    pub usage: Option<TokenUsage>,
    /// Provider-assigned response identifier, when surfaced.
    pub response_id: Option<String>,
}

/// Trait-driven abstraction for a concrete LLM provider.
///
/// An [`LLMClient`] translates the canonical message list into the provider's
/// wire format and normalizes the reply into an [`LLMResponse`].  It is the
/// sole provider contract the agent loop depends on.  Implementations **must**
/// be thread-safe (`Send + Sync`) so they can be shared behind `Arc` between
/// the loop and the summarizer, and must honor retry internally (the built-in
/// adapters route every network call through
/// [`retry_async`](crate::agentloop::retry::retry_async)).
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send the conversation and decode the provider reply.
    ///
    /// `messages` must include the system message; each adapter decides how
    /// to lift it into its protocol.  `tools` carries the callable tool set,
    /// rendered into the provider's declaration shape by the adapter.
    ///
    /// Implementations never mutate `messages`.
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<LLMResponse, LlmError>;

    /// The provider this client speaks to.
    fn provider(&self) -> crate::agentloop::config::Provider;

    /// Base URL requests are issued against.
    fn api_base_url(&self) -> &str;

    /// Identifier used to select the upstream model (e.g. `"gpt-4.1"`).
    fn model(&self) -> &str;

    /// Install or clear a callback observing retry attempts.
    ///
    /// The default implementation discards the callback; the built-in
    /// adapters store it and invoke it before every backoff sleep.
    fn set_retry_callback(&self, _callback: Option<RetryCallback>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_fill_role_specific_fields() {
        let sys = Message::system("S");
        assert_eq!(sys.role, Role::System);
        assert!(sys.call_id.is_none());

        let tool = Message::tool("get_weather", "c1", "sunny 25C");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.call_id.as_deref(), Some("c1"));
        assert_eq!(tool.name.as_deref(), Some("get_weather"));
    }

    #[test]
    fn empty_tool_call_list_collapses_to_none() {
        let msg = Message::assistant_turn("hi", None, None, Some(vec![]));
        assert!(msg.tool_calls.is_none());
        assert!(msg.tool_calls().is_none());
    }
}
