//! Error types for generation calls
//!
//! Three tiers, matching how a single logical call can go wrong:
//! - Transport failures talking to the backend (always retryable)
//! - Decode failures turning text into a typed record (retryable)
//! - Exhaustion once every attempt has failed (fatal to the call site)

/// Number of characters of offending text kept in a [`DecodeError`].
pub const PREVIEW_CHARS: usize = 200;

/// Errors raised by a [`GenerationPort`](crate::GenerationPort) backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Request exceeded the configured timeout
    #[error("request timed out after {duration_secs}s")]
    Timeout {
        /// Timeout that elapsed
        duration_secs: u64,
    },

    /// Connection or protocol failure
    #[error("http error: {0}")]
    Http(String),

    /// Backend answered with a non-success status
    #[error("backend returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Backend answered but carried no completion text
    #[error("backend returned an empty completion")]
    EmptyResponse,

    /// Backend is not configured or not reachable at all
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Response text could not be coerced into the expected record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("decode failed: {reason} (text starts with: {preview:?})")]
pub struct DecodeError {
    /// Last underlying decode failure
    pub reason: String,
    /// Leading slice of the offending text
    pub preview: String,
}

impl DecodeError {
    /// Create a decode error, keeping a bounded preview of `text`
    #[inline]
    #[must_use]
    pub fn new(reason: impl Into<String>, text: &str) -> Self {
        Self {
            reason: reason.into(),
            preview: preview(text),
        }
    }
}

/// Main generation error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Structural decode failure
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Every attempt for one logical call failed
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts performed
        attempts: u32,
        /// Error from the final attempt
        last: Box<GenerationError>,
    },
}

impl GenerationError {
    /// Check if a fresh attempt may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }

    /// Check if the retry budget is spent
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Innermost cause, unwrapping exhaustion
    #[must_use]
    pub fn root_cause(&self) -> &GenerationError {
        match self {
            Self::Exhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`
#[must_use]
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Result alias for generation calls
pub type GenerationResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_decode_are_retryable() {
        assert!(GenerationError::from(TransportError::EmptyResponse).is_retryable());
        assert!(GenerationError::from(DecodeError::new("bad", "x")).is_retryable());

        let exhausted = GenerationError::Exhausted {
            attempts: 3,
            last: Box::new(TransportError::Http("reset".into()).into()),
        };
        assert!(!exhausted.is_retryable());
        assert!(exhausted.is_exhausted());
    }

    #[test]
    fn exhausted_display_names_attempts_and_cause() {
        let err = GenerationError::Exhausted {
            attempts: 3,
            last: Box::new(TransportError::Timeout { duration_secs: 120 }.into()),
        };
        let text = err.to_string();
        assert!(text.starts_with("failed after 3 attempts"));
        assert!(text.contains("timed out after 120s"));
    }

    #[test]
    fn preview_is_bounded_and_char_safe() {
        let long = "角".repeat(PREVIEW_CHARS * 2);
        let err = DecodeError::new("eof", &long);
        assert_eq!(err.preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn root_cause_unwraps_nesting() {
        let inner = GenerationError::from(DecodeError::new("eof", "{"));
        let outer = GenerationError::Exhausted {
            attempts: 2,
            last: Box::new(inner),
        };
        assert!(matches!(outer.root_cause(), GenerationError::Decode(_)));
    }
}
