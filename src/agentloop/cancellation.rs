//! Cooperative cancellation for the agent loop.
//!
//! The loop never spawns a canceller task.  Instead it polls a
//! [`CancellationToken`] synchronously at three checkpoints (top of step,
//! after each provider response, after each tool call) and races only the
//! in-flight provider call against the token via [`generate_with_signal`].
//! This trades fine-grained preemption inside tools for simplicity; tool
//! authors honor the token themselves when they need to.
//!
//! On a positive poll the loop restores the conversation invariant with
//! [`cleanup_incomplete_messages`]: a cancelled turn is indivisible, so the
//! trailing assistant message and any tool results that followed it are
//! dropped together before the user might start a new turn.

use crate::agentloop::client_wrapper::{LLMClient, LLMResponse, Message, Role};
use crate::agentloop::error::LlmError;
use crate::agentloop::tool_protocol::Tool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Final answer reported for a cancelled run.
pub const CANCELLED_MESSAGE: &str = "Task cancelled by user.";

/// Drop the trailing incomplete assistant turn.
///
/// Truncates the list immediately before the **last** assistant-role message,
/// removing that message and everything after it (its tool results).  A list
/// without assistant messages is left untouched.
pub fn cleanup_incomplete_messages(messages: &mut Vec<Message>) {
    if let Some(index) = messages
        .iter()
        .rposition(|message| message.role == Role::Assistant)
    {
        messages.truncate(index);
    }
}

/// Call the provider, racing the request against the abort token.
///
/// An already-fired token fails fast without issuing the request.  Otherwise
/// the provider future is polled alongside the token's `cancelled()` future;
/// when the token wins, the in-flight request future is dropped on the spot —
/// futures are lazy, so no orphaned work survives the race.  The caller
/// appends the assistant message only after a successful resolve, which is
/// why cancellation during the provider call needs no cleanup.
pub async fn generate_with_signal(
    client: &Arc<dyn LLMClient>,
    messages: &[Message],
    tools: Option<&[Arc<dyn Tool>]>,
    signal: &CancellationToken,
) -> Result<LLMResponse, LlmError> {
    if signal.is_cancelled() {
        return Err(LlmError::Cancelled);
    }

    tokio::select! {
        biased;
        response = client.generate(messages, tools) => response,
        _ = signal.cancelled() => Err(LlmError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentloop::client_wrapper::ToolCall;
    use serde_json::json;

    #[test]
    fn cleanup_removes_last_assistant_turn_and_trailing_results() {
        let mut messages = vec![
            Message::system("S"),
            Message::user("u1"),
            Message::assistant("done earlier"),
            Message::user("u2"),
            Message::assistant_turn(
                "",
                None,
                None,
                Some(vec![ToolCall::new("c1", "t", json!({}))]),
            ),
            Message::tool("t", "c1", "partial"),
        ];
        cleanup_incomplete_messages(&mut messages);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages.last().map(|m| m.role), Some(Role::User));
    }

    #[test]
    fn cleanup_without_assistant_messages_is_a_noop() {
        let mut messages = vec![Message::system("S"), Message::user("u1")];
        cleanup_incomplete_messages(&mut messages);
        assert_eq!(messages.len(), 2);
    }
}
