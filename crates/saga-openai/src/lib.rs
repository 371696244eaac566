//! Saga OpenAI - chat completion backend
//!
//! Implements [`GenerationPort`] against any OpenAI-compatible
//! `POST {base_url}/chat/completions` endpoint. Retry, timeout accounting and
//! decoding stay in the [`RetryingCaller`](saga_generation::RetryingCaller);
//! this crate only moves one request over HTTP and maps failures into
//! [`TransportError`].

#![warn(unreachable_pub)]

use async_trait::async_trait;
use saga_generation::{GenerationConfig, GenerationPort, GenerationRequest, ProviderConfig, TransportError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest error body kept in a [`TransportError::Status`]
pub const MAX_ERROR_BODY: usize = 500;

/// Configuration errors raised while building a port
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    /// Requested provider is not configured
    #[error("provider {0:?} is not configured")]
    UnknownProvider(String),

    /// Provider has no base URL
    #[error("provider {0:?} has no base_url")]
    MissingBaseUrl(String),

    /// HTTP client could not be built
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Generation port over an OpenAI-compatible HTTP API
#[derive(Debug, Clone)]
pub struct OpenAiPort {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    name: String,
    timeout: Duration,
}

impl OpenAiPort {
    /// Create a port for one provider
    ///
    /// # Errors
    /// Fails when the base URL is empty or the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, provider: &ProviderConfig, timeout: Duration) -> Result<Self, OpenAiError> {
        let name = name.into();
        let base = provider.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(OpenAiError::MissingBaseUrl(name));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{base}/chat/completions"),
            api_key: provider.resolve_api_key(),
            model: provider.model.clone(),
            name,
            timeout,
        })
    }

    /// Create a port for the named provider, or the configured default
    ///
    /// # Errors
    /// Fails when the provider is unknown or invalid.
    pub fn from_config(config: &GenerationConfig, provider: Option<&str>) -> Result<Self, OpenAiError> {
        let name = provider
            .map(str::to_string)
            .or_else(|| config.default_provider.clone())
            .unwrap_or_default();
        let settings = config
            .provider(provider)
            .ok_or_else(|| OpenAiError::UnknownProvider(name.clone()))?;
        if settings.resolve_api_key().is_none() {
            tracing::warn!("provider {} has no API key; requests are sent unauthenticated", name);
        }
        Self::new(name, settings, config.request_timeout())
    }

    /// Completion endpoint URL
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Model name sent with every request
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_error(&self, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                duration_secs: self.timeout.as_secs(),
            }
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

#[async_trait]
impl GenerationPort for OpenAiPort {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, TransportError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        tracing::debug!("POST {} role={} model={}", self.endpoint, request.role, self.model);

        let response = builder.send().await.map_err(|e| self.map_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| self.map_error(&e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(TransportError::EmptyResponse)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use saga_generation::PromptRole;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use warp::http::StatusCode;
    use warp::Filter;

    fn provider(addr: SocketAddr) -> ProviderConfig {
        ProviderConfig {
            base_url: format!("http://{addr}/v1/"),
            api_key: "test-key".into(),
            api_key_env: None,
            model: "story-model".into(),
        }
    }

    fn port(addr: SocketAddr) -> OpenAiPort {
        OpenAiPort::new("local", &provider(addr), Duration::from_secs(5)).unwrap()
    }

    macro_rules! serve {
        ($filter:expr) => {{
            let (addr, server) = warp::serve($filter).bind_ephemeral(([127, 0, 0, 1], 0));
            tokio::spawn(server);
            addr
        }};
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let route = warp::post()
            .and(warp::path!("v1" / "chat" / "completions"))
            .and(warp::header::<String>("authorization"))
            .and(warp::body::json())
            .map(|auth: String, body: Value| {
                let echo = format!(
                    "{auth}|{}|{}|{}",
                    body["model"].as_str().unwrap_or_default(),
                    body["messages"][0]["role"].as_str().unwrap_or_default(),
                    body["messages"][1]["content"].as_str().unwrap_or_default(),
                );
                warp::reply::json(&json!({
                    "choices": [{"message": {"role": "assistant", "content": echo}}]
                }))
            });
        let addr = serve!(route);

        let request = GenerationRequest::new(PromptRole::CharacterCreator, "name a harbour");
        let text = port(addr).generate(&request).await.unwrap();
        assert_eq!(text, "Bearer test-key|story-model|system|name a harbour");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let route = warp::any().map(|| {
            warp::reply::with_status("overloaded", StatusCode::SERVICE_UNAVAILABLE)
        });
        let addr = serve!(route);

        let request = GenerationRequest::new(PromptRole::PlotDesigner, "events");
        let err = port(addr).generate(&request).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 503,
                body: "overloaded".into()
            }
        );
    }

    #[tokio::test]
    async fn empty_choices_are_an_empty_response() {
        let route = warp::any().map(|| warp::reply::json(&json!({ "choices": [] })));
        let addr = serve!(route);

        let request = GenerationRequest::new(PromptRole::PlotDesigner, "events");
        let err = port(addr).generate(&request).await.unwrap_err();
        assert_eq!(err, TransportError::EmptyResponse);
    }

    #[test]
    fn endpoint_joins_base_url() {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let p = port(addr);
        assert_eq!(p.endpoint(), "http://127.0.0.1:9/v1/chat/completions");
        assert_eq!(p.name(), "local");
    }

    #[test]
    fn missing_base_url_is_rejected() {
        let err = OpenAiPort::new("blank", &ProviderConfig::default(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, OpenAiError::MissingBaseUrl(name) if name == "blank"));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        let cut = truncate(&body);
        assert_eq!(cut.len(), MAX_ERROR_BODY + 3);
    }
}
