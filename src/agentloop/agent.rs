//! The observe–think–act loop.
//!
//! An [`Agent`] owns the canonical message list and orchestrates the provider
//! client, the tool executor, the summarizer, and the cancellation checkpoints
//! to drive one query to completion.  [`Agent::run`] returns an [`AgentRun`]:
//! a lazy, finite, non-restartable stream of
//! [`AgentEvent`](crate::agentloop::event::AgentEvent)s produced by suspending
//! after each event — the loop cannot outrun the consumer, and the final
//! answer string is available from the handle once the stream is drained.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentloop::{create_client, Agent, AgentEvent, LLMConfig, Provider};
//! use futures_util::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), agentloop::LlmError> {
//!     let key = std::env::var("ANTHROPIC_KEY").unwrap_or_default();
//!     let client = create_client(&LLMConfig::new(key, Provider::Anthropic, "claude-sonnet-4-0"))?;
//!
//!     let mut agent = Agent::new(client, "You are a helpful assistant.", vec![]);
//!     agent.add_user_message("What is the capital of France?");
//!
//!     let mut run = agent.run();
//!     while let Some(event) = run.next().await {
//!         if let AgentEvent::AssistantMessage { content } = event? {
//!             println!("{}", content);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Two concurrent runs on the same agent are undefined behaviour at the API
//! level; the `&mut self` receiver of [`Agent::run`] makes the compiler
//! enforce the required serialization.

use crate::agentloop::cancellation::{
    cleanup_incomplete_messages, generate_with_signal, CANCELLED_MESSAGE,
};
use crate::agentloop::client_wrapper::{LLMClient, Message};
use crate::agentloop::error::LlmError;
use crate::agentloop::event::AgentEvent;
use crate::agentloop::summarizer::maybe_summarize;
use crate::agentloop::tool_protocol::{execute_tool, Tool};
use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// Default token budget before the summarizer starts compressing.
const DEFAULT_TOKEN_LIMIT: usize = 80_000;

/// Default cap on observe–think–act steps per run.
const DEFAULT_MAX_STEPS: usize = 50;

/// An LLM-driven agent with a tool belt and a bounded conversation.
pub struct Agent {
    client: Arc<dyn LLMClient>,
    tools: Vec<Arc<dyn Tool>>,
    messages: Vec<Message>,
    token_limit: usize,
    max_steps: usize,
    api_total_tokens: usize,
    skip_next_token_check: bool,
}

impl Agent {
    /// Create an agent whose history is seeded with the system message.
    pub fn new(
        client: Arc<dyn LLMClient>,
        system_prompt: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Self {
        Agent {
            client,
            tools,
            messages: vec![Message::system(system_prompt.into())],
            token_limit: DEFAULT_TOKEN_LIMIT,
            max_steps: DEFAULT_MAX_STEPS,
            api_total_tokens: 0,
            skip_next_token_check: false,
        }
    }

    /// Override the default 80k token budget (builder pattern).
    pub fn with_token_limit(mut self, token_limit: usize) -> Self {
        self.token_limit = token_limit;
        self
    }

    /// Override the default 50-step cap (builder pattern).
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Append a user message to the conversation.
    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text.into()));
    }

    /// Inspect the conversation history.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Mutable access to the history, for seeding prior context and tests.
    ///
    /// Readers and writers outside the loop must only touch the list between
    /// steps; during [`run`](Agent::run) it is owned by the loop.
    pub fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    /// Last `total_tokens` figure reported by the provider.
    pub fn api_total_tokens(&self) -> usize {
        self.api_total_tokens
    }

    /// Run the loop with a token nobody will fire.
    pub fn run(&mut self) -> AgentRun<'_> {
        self.run_with_signal(CancellationToken::new())
    }

    /// Run the loop until a final answer, the step cap, or cancellation.
    ///
    /// The returned [`AgentRun`] yields events lazily; the loop is suspended
    /// between events until the consumer pulls the next one.  The token is
    /// polled at the top of each step, after each provider response, and
    /// after each tool call; the in-flight provider call itself races the
    /// token, so cancellation never waits on the network.
    pub fn run_with_signal(&mut self, signal: CancellationToken) -> AgentRun<'_> {
        let outcome = Arc::new(Mutex::new(None));
        let outcome_slot = Arc::clone(&outcome);
        let agent = self;

        let events = try_stream! {
            for _step in 0..agent.max_steps {
                if signal.is_cancelled() {
                    cleanup_incomplete_messages(&mut agent.messages);
                    yield AgentEvent::Cancelled;
                    set_outcome(&outcome_slot, CANCELLED_MESSAGE);
                    return;
                }

                if let Some(event) = maybe_summarize(
                    &agent.client,
                    &mut agent.messages,
                    agent.token_limit,
                    agent.api_total_tokens,
                    &mut agent.skip_next_token_check,
                )
                .await
                {
                    yield event;
                }

                let result = generate_with_signal(
                    &agent.client,
                    &agent.messages,
                    Some(&agent.tools),
                    &signal,
                )
                .await;
                let response = match result {
                    Err(err)
                        if signal.is_cancelled() || matches!(err, LlmError::Cancelled) =>
                    {
                        cleanup_incomplete_messages(&mut agent.messages);
                        yield AgentEvent::Cancelled;
                        set_outcome(&outcome_slot, CANCELLED_MESSAGE);
                        return;
                    }
                    other => other?,
                };

                if let Some(usage) = &response.usage {
                    agent.api_total_tokens = usage.total_tokens;
                }

                agent.messages.push(Message::assistant_turn(
                    response.content.clone(),
                    response.thinking.clone(),
                    response.reasoning_items.clone(),
                    response.tool_calls.clone(),
                ));

                if let Some(thinking) = response
                    .thinking
                    .as_deref()
                    .filter(|thinking| !thinking.is_empty())
                {
                    yield AgentEvent::Thinking {
                        content: thinking.to_string(),
                    };
                }

                let tool_calls = match response.tool_calls {
                    Some(calls) if !calls.is_empty() => calls,
                    _ => {
                        if !response.content.is_empty() {
                            yield AgentEvent::AssistantMessage {
                                content: response.content.clone(),
                            };
                        }
                        set_outcome(&outcome_slot, &response.content);
                        return;
                    }
                };

                if signal.is_cancelled() {
                    cleanup_incomplete_messages(&mut agent.messages);
                    yield AgentEvent::Cancelled;
                    set_outcome(&outcome_slot, CANCELLED_MESSAGE);
                    return;
                }

                for call in tool_calls {
                    yield AgentEvent::ToolCall { call: call.clone() };

                    let result = execute_tool(
                        &agent.tools,
                        &call.function.name,
                        call.function.arguments.clone(),
                    )
                    .await;

                    yield AgentEvent::ToolResult {
                        call: call.clone(),
                        result: result.clone(),
                    };

                    let content = if result.success {
                        result.content
                    } else {
                        format!(
                            "Error: {}",
                            result.error.as_deref().unwrap_or("unknown error")
                        )
                    };
                    agent.messages.push(Message::tool(
                        call.function.name.clone(),
                        call.call_id.clone(),
                        content,
                    ));

                    if signal.is_cancelled() {
                        cleanup_incomplete_messages(&mut agent.messages);
                        yield AgentEvent::Cancelled;
                        set_outcome(&outcome_slot, CANCELLED_MESSAGE);
                        return;
                    }
                }
            }

            set_outcome(
                &outcome_slot,
                &format!(
                    "Task couldn't be completed after {} steps.",
                    agent.max_steps
                ),
            );
        };

        AgentRun {
            events: Box::pin(events),
            outcome,
        }
    }
}

fn set_outcome(slot: &Arc<Mutex<Option<String>>>, text: &str) {
    *slot.lock().expect("outcome slot poisoned") = Some(text.to_string());
}

/// Handle for one in-flight [`Agent::run`].
///
/// Implements [`Stream`] over `Result<AgentEvent, LlmError>`; iterate to pull
/// events.  Errors that bubble out of the loop (e.g. retry exhaustion) appear
/// as the stream's final item.  Once the stream is exhausted, [`outcome`]
/// holds the final answer string; [`final_text`] drains and returns it in one
/// call when the caller does not care about individual events.
///
/// [`outcome`]: AgentRun::outcome
/// [`final_text`]: AgentRun::final_text
pub struct AgentRun<'a> {
    events: Pin<Box<dyn Stream<Item = Result<AgentEvent, LlmError>> + Send + 'a>>,
    outcome: Arc<Mutex<Option<String>>>,
}

impl Stream for AgentRun<'_> {
    type Item = Result<AgentEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.as_mut().poll_next(cx)
    }
}

impl AgentRun<'_> {
    /// The final answer, once the event stream has been drained.
    pub fn outcome(&self) -> Option<String> {
        self.outcome.lock().expect("outcome slot poisoned").clone()
    }

    /// Drain any remaining events and return the final answer.
    pub async fn final_text(mut self) -> Result<String, LlmError> {
        while let Some(event) = self.events.next().await {
            event?;
        }
        let outcome = self.outcome.lock().expect("outcome slot poisoned").take();
        Ok(outcome.unwrap_or_default())
    }
}
