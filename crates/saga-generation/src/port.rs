//! Generation port
//!
//! The consumed capability: send a prompt, get raw text back. Backends live in
//! other crates; everything in this crate talks to them only through
//! [`GenerationPort`].

use crate::error::TransportError;
use crate::role::{PromptRole, Sampling};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One request to a generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Role issuing the call; routing and audit metadata only
    pub role: PromptRole,
    /// User payload
    pub prompt: String,
    /// System payload
    pub system: String,
    /// Sampling temperature in `[0, 2]`
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Create a request for `role` with its built-in system payload and sampling
    #[inline]
    #[must_use]
    pub fn new(role: PromptRole, prompt: impl Into<String>) -> Self {
        let sampling = role.default_sampling();
        Self {
            role,
            prompt: prompt.into(),
            system: role.system_prompt().to_string(),
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        }
    }

    /// Override sampling parameters
    #[inline]
    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.temperature = sampling.temperature.clamp(0.0, 2.0);
        self.max_tokens = sampling.max_tokens;
        self
    }
}

/// Text generation capability
///
/// Implementations must be cheap to share; the caller holds them behind an
/// `Arc` and issues one request at a time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// Generate raw text for `request`
    async fn generate(&self, request: &GenerationRequest) -> Result<String, TransportError>;

    /// Backend name for logs
    fn name(&self) -> &str {
        "generation"
    }
}
