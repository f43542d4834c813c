//! LLM-driven context compression.
//!
//! Keeps the conversation below the agent's token limit without losing
//! task-critical facts.  When the estimated cost (or the provider-reported
//! total from the last call) exceeds the limit, the oldest *rounds* — a user
//! message plus everything up to the next user message — are rewritten into a
//! single synthetic summary message by calling the LLM.  The newest
//! [`RETAINED_ROUNDS`] rounds are never compressed.
//!
//! Two details are deliberate:
//!
//! - the summary is a **user**-role message with the stable
//!   [`SUMMARY_PREFIX`] marker, so providers that segregate system prompts
//!   never merge it with the real instructions, and a later compression can
//!   find the prior summary with a prefix check and fold it in;
//! - reasoning text is never included in the compression input, so
//!   chain-of-thought does not persist into context after the original
//!   thinking block is dropped.
//!
//! Summarization is an optimization, not a correctness gate: any failure is
//! swallowed, logged, and debounced via the agent's one-shot
//! `skip_next_token_check` flag so the next step proceeds normally instead of
//! hot-looping on a broken summarizer.

use crate::agentloop::client_wrapper::{LLMClient, Message, MessageContent, Role};
use crate::agentloop::event::AgentEvent;
use crate::agentloop::tokens::estimate_tokens;
use std::sync::Arc;

/// Marker prefix identifying the synthetic summary message.
pub const SUMMARY_PREFIX: &str = "[Context Summary]";

/// Number of most-recent rounds that are never compressed.
pub const RETAINED_ROUNDS: usize = 3;

/// Tool results are truncated to this many characters in compression input.
const TOOL_RESULT_LIMIT: usize = 500;

/// Fixed interlude between the marker and the summary body.
const SUMMARY_INTERLUDE: &str =
    "The following is a summary of our previous conversation, not a new user request.";

/// System prompt for the compression call.
const SUMMARIZER_SYSTEM_PROMPT: &str = "You are a conversation summarizer. Condense the \
conversation below into a concise English summary of at most 2000 words. Preserve task-critical \
facts: user goals, decisions, tool outcomes, file or entity names, and unresolved questions. If a \
\"Previous Context Summary\" section is present, integrate it into the new summary instead of \
repeating it. Output only the summary text.";

/// Inspect the conversation and compress old rounds when the token budget is
/// exceeded.
///
/// Returns the [`AgentEvent::Summarized`] event on success and `None` when no
/// compression happened (below budget, too few rounds, debounced, or the
/// compression call failed).  On any attempt — successful or not —
/// `skip_next_token_check` is set so the immediately following inspection is
/// suppressed.
pub async fn maybe_summarize(
    client: &Arc<dyn LLMClient>,
    messages: &mut Vec<Message>,
    token_limit: usize,
    api_total_tokens: usize,
    skip_next_token_check: &mut bool,
) -> Option<AgentEvent> {
    if *skip_next_token_check {
        *skip_next_token_check = false;
        return None;
    }

    let before_tokens = estimate_tokens(messages);
    if before_tokens <= token_limit && api_total_tokens <= token_limit {
        return None;
    }

    // The system message at index 0 is excluded from round partitioning.
    let round_starts = round_starts(messages);
    if round_starts.len() <= RETAINED_ROUNDS {
        return None;
    }
    let keep_from = round_starts[round_starts.len() - RETAINED_ROUNDS];

    let mut existing_summary = None;
    let mut gathered = Vec::new();
    for message in &messages[1..keep_from] {
        if let Some(body) = summary_body(message) {
            existing_summary = Some(body.to_string());
        } else {
            gathered.push(message);
        }
    }

    let input = build_compression_input(existing_summary.as_deref(), &gathered);
    let request = [
        Message::system(SUMMARIZER_SYSTEM_PROMPT),
        Message::user(input),
    ];

    let summary_text = match client.generate(&request, None).await {
        Ok(response) if !response.content.trim().is_empty() => response.content,
        Ok(_) => {
            log::warn!("maybe_summarize: compression call returned empty text, keeping history");
            *skip_next_token_check = true;
            return None;
        }
        Err(err) => {
            log::warn!("maybe_summarize: compression call failed ({}), keeping history", err);
            *skip_next_token_check = true;
            return None;
        }
    };

    let summary_message = Message::user(format!(
        "{}\n\n{}\n\n{}",
        SUMMARY_PREFIX, SUMMARY_INTERLUDE, summary_text
    ));

    let mut rebuilt = Vec::with_capacity(messages.len() - keep_from + 2);
    rebuilt.push(messages[0].clone());
    rebuilt.push(summary_message);
    rebuilt.extend_from_slice(&messages[keep_from..]);
    *messages = rebuilt;

    let after_tokens = estimate_tokens(messages);
    *skip_next_token_check = true;

    if log::log_enabled!(log::Level::Info) {
        log::info!(
            "maybe_summarize: compressed history {} -> {} estimated tokens",
            before_tokens,
            after_tokens
        );
    }

    Some(AgentEvent::Summarized {
        before_tokens,
        after_tokens,
    })
}

/// Indices where each round begins: every user-role message after the system
/// message starts a new round that runs to the next user message.
fn round_starts(messages: &[Message]) -> Vec<usize> {
    messages
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, message)| message.role == Role::User)
        .map(|(index, _)| index)
        .collect()
}

/// The body of a prior summary message, or `None` for ordinary messages.
fn summary_body(message: &Message) -> Option<&str> {
    if message.role != Role::User {
        return None;
    }
    let text = message.content.as_text()?;
    let rest = text.strip_prefix(SUMMARY_PREFIX)?;
    let rest = rest.trim_start();
    Some(rest.strip_prefix(SUMMARY_INTERLUDE).unwrap_or(rest).trim_start())
}

/// Render the gathered messages as the plain-text compression input.
fn build_compression_input(existing_summary: Option<&str>, messages: &[&Message]) -> String {
    let mut input = String::new();

    if let Some(previous) = existing_summary.filter(|summary| !summary.is_empty()) {
        input.push_str("## Previous Context Summary\n\n");
        input.push_str(previous);
        input.push_str("\n\n");
    }

    for message in messages {
        match message.role {
            Role::User => {
                input.push_str("## User\n\n");
                input.push_str(&content_text(&message.content));
                input.push_str("\n\n");
            }
            Role::Assistant => {
                input.push_str("## Assistant\n\n");
                let text = content_text(&message.content);
                if !text.is_empty() {
                    input.push_str(&text);
                    input.push('\n');
                }
                if let Some(calls) = message.tool_calls() {
                    let names: Vec<&str> = calls
                        .iter()
                        .map(|call| call.function.name.as_str())
                        .collect();
                    input.push_str("Tools called: ");
                    input.push_str(&names.join(", "));
                    input.push('\n');
                }
                input.push('\n');
            }
            Role::Tool => {
                input.push_str("## Tool Result (");
                input.push_str(message.name.as_deref().unwrap_or("unknown"));
                input.push_str(")\n\n");
                let text = content_text(&message.content);
                if text.chars().count() > TOOL_RESULT_LIMIT {
                    input.extend(text.chars().take(TOOL_RESULT_LIMIT));
                    input.push_str("…");
                } else {
                    input.push_str(&text);
                }
                input.push_str("\n\n");
            }
            Role::System => {}
        }
    }

    input
}

fn content_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => serde_json::to_string(blocks).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentloop::client_wrapper::ToolCall;
    use serde_json::json;

    fn round(user: &str, assistant: &str) -> Vec<Message> {
        vec![Message::user(user), Message::assistant(assistant)]
    }

    #[test]
    fn rounds_start_at_each_user_message() {
        let mut messages = vec![Message::system("S")];
        messages.extend(round("u1", "a1"));
        messages.push(Message::tool("t", "c1", "result"));
        messages.extend(round("u2", "a2"));
        let starts = round_starts(&messages);
        assert_eq!(starts, vec![1, 4]);
    }

    #[test]
    fn summary_body_strips_marker_and_interlude() {
        let message = Message::user(format!(
            "{}\n\n{}\n\nthe facts so far",
            SUMMARY_PREFIX, SUMMARY_INTERLUDE
        ));
        assert_eq!(summary_body(&message), Some("the facts so far"));
        assert_eq!(summary_body(&Message::user("plain")), None);
        assert_eq!(summary_body(&Message::assistant(SUMMARY_PREFIX)), None);
    }

    #[test]
    fn compression_input_skips_thinking_and_truncates_tool_results() {
        let assistant = Message::assistant_turn(
            "checking",
            Some("secret chain of thought".to_string()),
            None,
            Some(vec![ToolCall::new("c1", "get_weather", json!({}))]),
        );
        let long_result = "x".repeat(900);
        let tool = Message::tool("get_weather", "c1", long_result);
        let user = Message::user("what's the weather?");
        let gathered = vec![&user, &assistant, &tool];

        let input = build_compression_input(None, &gathered);
        assert!(input.contains("what's the weather?"));
        assert!(input.contains("Tools called: get_weather"));
        assert!(!input.contains("secret chain of thought"));
        // 500 chars of payload plus the ellipsis, not the full 900.
        assert!(!input.contains(&"x".repeat(501)));
        assert!(input.contains(&"x".repeat(500)));
    }

    #[test]
    fn prior_summary_leads_the_input() {
        let user = Message::user("next question");
        let gathered = vec![&user];
        let input = build_compression_input(Some("earlier facts"), &gathered);
        assert!(input.starts_with("## Previous Context Summary"));
        assert!(input.contains("earlier facts"));
    }
}
