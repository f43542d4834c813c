//! Token counting and conversation-cost estimation.
//!
//! Counting uses the GPT-4-compatible `cl100k_base` BPE from `tiktoken-rs`,
//! initialised once behind a `lazy_static` singleton because building the
//! vocabulary is expensive.  The estimate is deliberately provider-agnostic;
//! when available, the provider-reported `total_tokens` is the more reliable
//! signal and the summarizer consults both.

use crate::agentloop::client_wrapper::{Message, MessageContent};
use lazy_static::lazy_static;
use tiktoken_rs::CoreBPE;

/// Fixed per-message overhead covering role and framing tokens.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

lazy_static! {
    /// Shared `cl100k_base` vocabulary.
    static ref BPE: CoreBPE =
        tiktoken_rs::cl100k_base().expect("failed to load cl100k_base vocabulary");
}

/// Count the BPE tokens in `text`. Empty input counts as zero.
pub fn count_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    BPE.encode_with_special_tokens(text).len()
}

/// Estimate the token cost of a message list.
///
/// String content is counted directly; structured content and tool calls are
/// JSON-encoded and counted; `thinking` text is counted; each message adds a
/// fixed 4-token framing overhead, so even a bare system message estimates
/// above zero.
pub fn estimate_tokens(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|message| {
            let mut total = MESSAGE_OVERHEAD_TOKENS;
            total += match &message.content {
                MessageContent::Text(text) => count_tokens(text),
                MessageContent::Blocks(blocks) => {
                    count_tokens(&serde_json::to_string(blocks).unwrap_or_default())
                }
            };
            if let Some(thinking) = &message.thinking {
                total += count_tokens(thinking);
            }
            if let Some(calls) = &message.tool_calls {
                total += count_tokens(&serde_json::to_string(calls).unwrap_or_default());
            }
            total
        })
        .sum()
}
