//! Shared plumbing used by the four provider adapters.
//!
//! Every adapter is a thin struct around a [`ClientCore`], which owns the
//! credentials, the retry policy, and a handle to the process-wide pooled
//! [`reqwest`] client.  The single HTTP client keeps TLS sessions and DNS
//! lookups warm, which significantly reduces latency when many requests are
//! issued to upstream providers.

use crate::agentloop::config::LLMConfig;
use crate::agentloop::error::LlmError;
use crate::agentloop::retry::{retry_async, RetryCallback, RetryConfig};
use lazy_static::lazy_static;
use std::sync::Mutex;
use std::time::Duration;

lazy_static! {
    /// Shared HTTP client with persistent connection pooling.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = {
        reqwest::ClientBuilder::new()
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build shared HTTP client")
    };
}

/// Borrow the lazily initialised shared [`reqwest::Client`].
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Credentials, endpoint, and retry state common to every adapter.
pub(crate) struct ClientCore {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub retry: RetryConfig,
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
    retry_callback: Mutex<Option<RetryCallback>>,
    http: reqwest::Client,
}

impl ClientCore {
    /// Build a core from the dispatcher configuration, falling back to the
    /// provider's public endpoint when no base URL is configured.
    pub fn new(config: &LLMConfig, default_base_url: &str) -> Self {
        let base_url = config
            .api_base_url
            .clone()
            .unwrap_or_else(|| default_base_url.to_string());
        ClientCore {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
            options: config.provider_options.clone(),
            retry_callback: Mutex::new(None),
            http: get_shared_http_client().clone(),
        }
    }

    /// Replace the retry observer.
    pub fn set_retry_callback(&self, callback: Option<RetryCallback>) {
        *self
            .retry_callback
            .lock()
            .expect("retry callback slot poisoned") = callback;
    }

    /// Read a numeric provider option (e.g. Anthropic `max_tokens`).
    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options
            .as_ref()
            .and_then(|options| options.get(key))
            .and_then(|value| value.as_u64())
    }

    /// POST `body` to `url` with `headers`, routed through the retry wrapper.
    ///
    /// Non-success statuses become [`LlmError::Api`] and are retried like
    /// transport failures; the parsed JSON body is returned on success.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let callback = self
            .retry_callback
            .lock()
            .expect("retry callback slot poisoned")
            .clone();

        retry_async(
            || {
                // Copy the borrows into the future so each attempt owns them.
                let (this, url, headers, body) = (self, url, headers, body);
                async move {
                    let mut request = this
                        .http
                        .post(url)
                        .header("Content-Type", "application/json");
                    for (name, value) in headers {
                        request = request.header(*name, value.as_str());
                    }
                    let response = request.json(body).send().await?;
                    let status = response.status();
                    let text = response.text().await?;
                    if !status.is_success() {
                        if log::log_enabled!(log::Level::Error) {
                            log::error!("post_json: HTTP {} from {}: {}", status, url, text);
                        }
                        return Err(LlmError::Api {
                            status: status.as_u16(),
                            url: url.to_string(),
                            body: text,
                        });
                    }
                    Ok(serde_json::from_str(&text)?)
                }
            },
            &self.retry,
            callback.as_ref(),
        )
        .await
    }
}
