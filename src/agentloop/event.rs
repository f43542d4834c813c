//! Typed events streamed by [`Agent::run`](crate::agentloop::agent::Agent::run).
//!
//! The agent exposes a lazy, finite, non-restartable sequence of these events
//! rather than a callback registry: the loop suspends after each event until
//! the consumer pulls the next one, which gives natural backpressure and
//! interleaves cleanly with the cancellation polls.
//!
//! Events are emitted in strict temporal order of their underlying actions:
//! for a given call, `ToolCall` precedes its `ToolResult`; `Thinking`
//! precedes `AssistantMessage` of the same turn; `Summarized` precedes the
//! provider response it made room for.

use crate::agentloop::client_wrapper::ToolCall;
use crate::agentloop::tool_protocol::ToolResult;

/// One observable step of an agent run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The model produced reasoning text this turn.
    Thinking {
        /// Concatenated reasoning text, for display.
        content: String,
    },

    /// The model requested a tool invocation.
    ToolCall {
        /// The requested call, including its correlation ID.
        call: ToolCall,
    },

    /// A tool invocation completed (successfully or not).
    ToolResult {
        /// The originating call.
        call: ToolCall,
        /// The tool's outcome as recorded into the conversation.
        result: ToolResult,
    },

    /// The model produced a final answer with no further tool calls.
    AssistantMessage {
        /// The answer text.
        content: String,
    },

    /// The run was cancelled via the abort token; partial state was cleaned up.
    Cancelled,

    /// Old rounds were compressed into a context summary message.
    Summarized {
        /// Token estimate before compression.
        before_tokens: usize,
        /// Token estimate after compression.
        after_tokens: usize,
    },
}
