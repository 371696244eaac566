//! Saga Generation - the boundary to text-generation backends
//!
//! Provides:
//! - [`GenerationPort`], the consumed capability (`prompt -> raw text`)
//! - [`ResultDecoder`], tolerant JSON recovery from fenced or prose-wrapped text
//! - [`RetryingCaller`], bounded retry with linear capped backoff and per-attempt timeouts
//! - [`PromptRole`], the closed set of call roles and their system payloads
//! - [`GenerationConfig`], explicit configuration loaded from YAML or TOML
//!
//! # Example
//!
//! ```rust,ignore
//! use saga_generation::{CallLog, GenerationConfig, PromptRole, RetryingCaller};
//! use std::sync::Arc;
//!
//! # async fn example(port: Arc<dyn saga_generation::GenerationPort>) -> Result<(), Box<dyn std::error::Error>> {
//! let caller = RetryingCaller::new(port, GenerationConfig::new());
//! let mut log = CallLog::new();
//! let value: serde_json::Value = caller
//!     .call_with_retry(&mut log, PromptRole::PlotDesigner, "List the key events")
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod audit;
pub mod config;
pub mod decoder;
pub mod error;
pub mod port;
pub mod retry;
pub mod role;

pub use audit::{AttemptOutcome, AttemptRecord, AuditSink, CallLog};
pub use config::{ConfigError, GenerationConfig, LogFormat, LoggingConfig, ProviderConfig, TimeoutConfig};
pub use decoder::{extract_fences, DecodeStrategy, Decoded, Fence, ResponseSchema, ResultDecoder};
pub use error::{DecodeError, GenerationError, GenerationResult, TransportError, PREVIEW_CHARS};
pub use port::{GenerationPort, GenerationRequest};
pub use retry::{RetryPolicy, RetryingCaller};
pub use role::{PromptRole, Sampling};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for issuing generation calls
    pub use crate::{
        AuditSink, GenerationConfig, GenerationError, GenerationPort, GenerationRequest,
        PromptRole, ResponseSchema, RetryPolicy, RetryingCaller, TransportError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
