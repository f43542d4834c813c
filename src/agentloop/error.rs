//! Error taxonomy shared by the provider adapters and the agent loop.
//!
//! Three rules shape the taxonomy:
//!
//! - transport failures are wrapped by the retry utility and only surface as
//!   [`LlmError::RetryExhausted`] once the budget is spent;
//! - protocol violations (malformed tool-call JSON, missing required fields)
//!   propagate unmasked so they are visible at the call site;
//! - cancellation is never an error to the caller — the loop converts
//!   [`LlmError::Cancelled`] into a `Cancelled` event and a normal return.

use thiserror::Error;

/// Errors produced while talking to a provider or driving the agent loop.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Unknown provider tag at dispatcher construction. Unrecoverable.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Non-success HTTP status from the provider endpoint.
    #[error("HTTP {status} from {url}: {body}")]
    Api {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Request URL, for diagnostics.
        url: String,
        /// Raw response body.
        body: String,
    },

    /// The provider replied with a shape the adapter cannot decode.
    #[error("malformed provider response: {0}")]
    Protocol(String),

    /// Network-level failure from the HTTP client.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// JSON (de)serialization failure, e.g. malformed tool-call arguments.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The retry budget was exhausted without a successful call.
    #[error("request failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        /// Total attempts made, including the first.
        attempts: usize,
        /// The error returned by the final attempt.
        last_error: Box<LlmError>,
    },

    /// The operation was cancelled via the abort token.
    #[error("operation cancelled")]
    Cancelled,
}
