//! Provider selection and client construction.
//!
//! [`create_client`] is a thin strategy selector: the [`Provider`] tag in the
//! [`LLMConfig`] picks one of the four adapters, all of which sit behind the
//! single [`LLMClient`](crate::agentloop::client_wrapper::LLMClient) contract.
//! Adding a fifth provider is a new adapter file plus one match arm here, not
//! a modification of the loop.
//!
//! # Example
//!
//! ```rust
//! use agentloop::{create_client, LLMConfig, Provider};
//!
//! let config = LLMConfig::new("sk-none", Provider::Anthropic, "claude-sonnet-4-0");
//! let client = create_client(&config).expect("known provider");
//! assert_eq!(client.model(), "claude-sonnet-4-0");
//! assert_eq!(client.api_base_url(), "https://api.anthropic.com/v1");
//! ```

use crate::agentloop::client_wrapper::LLMClient;
use crate::agentloop::clients::anthropic::AnthropicClient;
use crate::agentloop::clients::gemini::GeminiClient;
use crate::agentloop::clients::openai_chat::OpenAIChatClient;
use crate::agentloop::clients::openai_responses::OpenAIResponsesClient;
use crate::agentloop::error::LlmError;
use crate::agentloop::retry::RetryConfig;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI Responses API (typed item sequence).
    OpenAIResponses,
    /// OpenAI Chat Completions API.
    OpenAIChat,
    /// Google Gemini Generative Language API.
    Gemini,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAIResponses => "openai-responses",
            Provider::OpenAIChat => "openai-chat",
            Provider::Gemini => "gemini",
        };
        write!(f, "{}", tag)
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    /// Parse a provider tag. Unknown tags fail with
    /// [`LlmError::UnsupportedProvider`], raised at configuration time.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "anthropic" => Ok(Provider::Anthropic),
            "openai-responses" => Ok(Provider::OpenAIResponses),
            "openai" | "openai-chat" => Ok(Provider::OpenAIChat),
            "gemini" => Ok(Provider::Gemini),
            other => Err(LlmError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Configuration record consumed by [`create_client`].
#[derive(Clone)]
pub struct LLMConfig {
    /// Provider credential.
    pub api_key: String,
    /// Which wire protocol to speak.
    pub provider: Provider,
    /// Endpoint override; each adapter supplies its public default.
    pub api_base_url: Option<String>,
    /// Model identifier forwarded verbatim to the provider.
    pub model: String,
    /// Provider-specific knobs (e.g. Anthropic `max_tokens`).
    pub provider_options: Option<serde_json::Map<String, serde_json::Value>>,
    /// Backoff policy for the adapter's network calls.
    pub retry: RetryConfig,
}

impl LLMConfig {
    /// Create a configuration with default endpoint and retry policy.
    pub fn new(api_key: impl Into<String>, provider: Provider, model: impl Into<String>) -> Self {
        LLMConfig {
            api_key: api_key.into(),
            provider,
            api_base_url: None,
            model: model.into(),
            provider_options: None,
            retry: RetryConfig::default(),
        }
    }

    /// Point the client at a custom base URL (builder pattern).
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = Some(base_url.into());
        self
    }

    /// Attach provider-specific options (builder pattern).
    pub fn with_provider_options(
        mut self,
        options: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.provider_options = Some(options);
        self
    }

    /// Override the retry policy (builder pattern).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Construct the adapter selected by `config.provider`.
///
/// The returned client exposes `provider()`, `api_base_url()` and `model()`
/// for introspection and accepts a retry callback via
/// [`set_retry_callback`](crate::agentloop::client_wrapper::LLMClient::set_retry_callback).
pub fn create_client(config: &LLMConfig) -> Result<Arc<dyn LLMClient>, LlmError> {
    Ok(match config.provider {
        Provider::Anthropic => Arc::new(AnthropicClient::new(config)),
        Provider::OpenAIResponses => Arc::new(OpenAIResponsesClient::new(config)),
        Provider::OpenAIChat => Arc::new(OpenAIChatClient::new(config)),
        Provider::Gemini => Arc::new(GeminiClient::new(config)),
    })
}
