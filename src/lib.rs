// src/lib.rs

// Import the top-level `agentloop` module.
pub mod agentloop;

// Re-exporting key items for easier external access.
pub use agentloop::agent::{Agent, AgentRun};
pub use agentloop::client_wrapper::{
    FunctionCall, LLMClient, LLMResponse, Message, MessageContent, ReasoningItem, Role, TokenUsage,
    ToolCall,
};
pub use agentloop::config::{create_client, LLMConfig, Provider};
pub use agentloop::error::LlmError;
pub use agentloop::event::AgentEvent;
pub use agentloop::tool_protocol::{Tool, ToolResult};

// Module aliases so the submodules are reachable without navigating through
// the `agentloop` hierarchy (e.g. `agentloop::clients::gemini`).
pub use agentloop::{
    cancellation, client_wrapper, clients, config, error, event, retry, summarizer, tokens,
    tool_protocol,
};
