//! Retrying caller
//!
//! The single path through which generation calls are made. One logical call
//! is at most `max_attempts` port invocations; between attempts the caller
//! sleeps `min(initial_delay * attempt, max_delay)`.

use crate::audit::{AttemptOutcome, AttemptRecord, AuditSink};
use crate::config::GenerationConfig;
use crate::decoder::{DecodeStrategy, ResponseSchema, ResultDecoder};
use crate::error::{DecodeError, GenerationError, GenerationResult, TransportError};
use crate::port::{GenerationPort, GenerationRequest};
use crate::role::PromptRole;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Linear, capped backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Upper bound on attempts per logical call
    pub max_attempts: u32,
    /// Base delay in seconds
    pub initial_delay: u64,
    /// Delay ceiling in seconds
    pub max_delay: u64,
}

impl RetryPolicy {
    /// Create a policy
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: u64, max_delay: u64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Policy that never sleeps
    #[inline]
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, 0, 0)
    }

    /// Delay after failed attempt number `attempt` (1-based)
    #[inline]
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = self
            .initial_delay
            .saturating_mul(u64::from(attempt))
            .min(self.max_delay);
        Duration::from_secs(secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 2, 10)
    }
}

/// Wraps a [`GenerationPort`] with decoding, timeouts and bounded retry
#[derive(Clone)]
pub struct RetryingCaller {
    port: Arc<dyn GenerationPort>,
    config: Arc<GenerationConfig>,
    decoder: ResultDecoder,
}

impl std::fmt::Debug for RetryingCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingCaller")
            .field("retry", &self.config.retry)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl RetryingCaller {
    /// Create a caller over `port`
    #[must_use]
    pub fn new(port: Arc<dyn GenerationPort>, config: GenerationConfig) -> Self {
        Self {
            port,
            config: Arc::new(config),
            decoder: ResultDecoder::new(),
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Name of the underlying backend
    #[inline]
    #[must_use]
    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    /// Active retry policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.config.retry
    }

    /// Build the request for `role`, applying configured sampling
    #[must_use]
    pub fn request(&self, role: PromptRole, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(role, prompt).with_sampling(self.config.sampling_for(role))
    }

    /// Call and decode a structured response of type `T`
    ///
    /// The expected JSON Schema of `T` is appended to the prompt.
    ///
    /// # Errors
    /// Returns [`GenerationError::Exhausted`] wrapping the final failure once
    /// every attempt has failed.
    pub async fn call_with_retry<T: ResponseSchema>(
        &self,
        audit: &mut dyn AuditSink,
        role: PromptRole,
        prompt: &str,
    ) -> GenerationResult<T> {
        let request = self.request(role, with_json_instruction::<T>(prompt));
        self.run(audit, &request, |decoder, raw| {
            decoder
                .decode::<T>(raw)
                .map(|d| (d.value, Some(d.strategy)))
        })
        .await
    }

    /// Call and return trimmed prose
    ///
    /// # Errors
    /// Returns [`GenerationError::Exhausted`] once every attempt has failed
    /// or returned only whitespace.
    pub async fn call_text(
        &self,
        audit: &mut dyn AuditSink,
        role: PromptRole,
        prompt: &str,
    ) -> GenerationResult<String> {
        let request = self.request(role, prompt);
        self.run(audit, &request, |decoder, raw| {
            decoder.decode_text(raw).map(|text| (text, None))
        })
        .await
    }

    async fn run<T, F>(
        &self,
        audit: &mut dyn AuditSink,
        request: &GenerationRequest,
        decode: F,
    ) -> GenerationResult<T>
    where
        F: Fn(&ResultDecoder, &str) -> Result<(T, Option<DecodeStrategy>), DecodeError> + Sync,
    {
        let policy = self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        let timeout = self.config.request_timeout();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, self.port.generate(request)).await {
                Ok(Ok(raw)) => decode(&self.decoder, &raw).map_err(GenerationError::from),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(TransportError::Timeout {
                    duration_secs: timeout.as_secs(),
                }
                .into()),
            };
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok((value, strategy)) => {
                    tracing::debug!(
                        "{} attempt {}/{} succeeded in {}ms",
                        request.role,
                        attempt,
                        max_attempts,
                        elapsed_ms
                    );
                    audit.record_attempt(AttemptRecord {
                        role: request.role,
                        attempt,
                        max_attempts,
                        elapsed_ms,
                        outcome: AttemptOutcome::Success { strategy },
                    });
                    return Ok(value);
                }
                Err(err) => {
                    let remaining = attempt < max_attempts;
                    tracing::warn!(
                        "{} attempt {}/{} failed after {}ms: {}",
                        request.role,
                        attempt,
                        max_attempts,
                        elapsed_ms,
                        err
                    );
                    let error = err.to_string();
                    audit.record_attempt(AttemptRecord {
                        role: request.role,
                        attempt,
                        max_attempts,
                        elapsed_ms,
                        outcome: if remaining {
                            AttemptOutcome::Retrying { error }
                        } else {
                            AttemptOutcome::Failed { error }
                        },
                    });
                    last_error = Some(err);

                    if remaining {
                        let delay = policy.delay_for(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        let last = last_error
            .unwrap_or_else(|| TransportError::Unavailable("no attempt was made".into()).into());
        Err(GenerationError::Exhausted {
            attempts: max_attempts,
            last: Box::new(last),
        })
    }
}

fn with_json_instruction<T: ResponseSchema>(prompt: &str) -> String {
    let schema = serde_json::to_string(&schemars::schema_for!(T)).unwrap_or_default();
    format!(
        "{prompt}\n\nRespond with a single JSON object and nothing else. \
         It must conform to this JSON Schema:\n{schema}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CallLog;
    use crate::port::MockGenerationPort;
    use async_trait::async_trait;
    use mockall::Sequence;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn caller(port: impl GenerationPort + 'static, policy: RetryPolicy) -> RetryingCaller {
        RetryingCaller::new(Arc::new(port), GenerationConfig::new().with_retry(policy))
    }

    #[tokio::test]
    async fn first_success_makes_one_call() {
        let mut port = MockGenerationPort::new();
        port.expect_generate()
            .times(1)
            .returning(|_| Ok(r#"{"a": 1}"#.to_string()));

        let mut log = CallLog::new();
        let value: Value = caller(port, RetryPolicy::immediate(3))
            .call_with_retry(&mut log, PromptRole::PlotDesigner, "events")
            .await
            .unwrap();

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(log.len(), 1);
        assert!(log.records()[0].outcome.is_success());
    }

    #[tokio::test]
    async fn always_failing_port_exhausts_after_max_attempts() {
        let mut port = MockGenerationPort::new();
        port.expect_generate()
            .times(4)
            .returning(|_| Err(TransportError::Http("connection reset".into())));

        let mut log = CallLog::new();
        let err = caller(port, RetryPolicy::immediate(4))
            .call_with_retry::<Value>(&mut log, PromptRole::ChapterPlanner, "plan")
            .await
            .unwrap_err();

        match &err {
            GenerationError::Exhausted { attempts, last } => {
                assert_eq!(*attempts, 4);
                assert!(matches!(**last, GenerationError::Transport(_)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(log.len(), 4);
        let attempts: Vec<u32> = log.records().iter().map(|r| r.attempt).collect();
        assert_eq!(attempts, vec![1, 2, 3, 4]);
        assert!(matches!(
            log.records()[3].outcome,
            AttemptOutcome::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn decode_failure_is_retried() {
        let mut seq = Sequence::new();
        let mut port = MockGenerationPort::new();
        port.expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("I cannot produce JSON today".to_string()));
        port.expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("```json\n{\"ok\": true}\n```".to_string()));

        let mut log = CallLog::new();
        let value: Value = caller(port, RetryPolicy::immediate(3))
            .call_with_retry(&mut log, PromptRole::ConflictDesigner, "design")
            .await
            .unwrap();

        assert_eq!(value, json!({"ok": true}));
        assert_eq!(log.len(), 2);
        assert!(matches!(
            log.records()[1].outcome,
            AttemptOutcome::Success {
                strategy: Some(DecodeStrategy::TaggedFence)
            }
        ));
    }

    #[tokio::test]
    async fn structured_prompt_carries_schema_and_role_system() {
        let mut port = MockGenerationPort::new();
        port.expect_generate()
            .withf(|req| {
                req.prompt.starts_with("base prompt")
                    && req.prompt.contains("JSON Schema")
                    && req.system == PromptRole::ForeshadowArchitect.system_prompt()
            })
            .times(1)
            .returning(|_| Ok("{}".to_string()));

        let mut log = CallLog::new();
        let _: Value = caller(port, RetryPolicy::immediate(1))
            .call_with_retry(&mut log, PromptRole::ForeshadowArchitect, "base prompt")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_prose_is_retried_then_exhausted() {
        let mut port = MockGenerationPort::new();
        port.expect_generate()
            .times(2)
            .returning(|_| Ok("   ".to_string()));

        let mut log = CallLog::new();
        let err = caller(port, RetryPolicy::immediate(2))
            .call_text(&mut log, PromptRole::SceneDesigner, "purpose")
            .await
            .unwrap_err();
        assert!(matches!(err.root_cause(), GenerationError::Decode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_sleeps_between_attempts_only() {
        let mut port = MockGenerationPort::new();
        port.expect_generate()
            .times(4)
            .returning(|_| Err(TransportError::EmptyResponse));

        let started = Instant::now();
        let mut log = CallLog::new();
        let _ = caller(port, RetryPolicy::new(4, 2, 3))
            .call_text(&mut log, PromptRole::ArcDesigner, "change")
            .await;

        // 2s, then 3s, then 3s; nothing after the last attempt
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(8), "waited {waited:?}");
        assert!(waited < Duration::from_secs(9), "waited {waited:?}");
    }

    struct StalledPort;

    #[async_trait]
    impl GenerationPort for StalledPort {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, TransportError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("{}".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_times_out() {
        let config = GenerationConfig::new()
            .with_retry(RetryPolicy::immediate(2))
            .with_request_timeout(5);
        let caller = RetryingCaller::new(Arc::new(StalledPort), config);

        let mut log = CallLog::new();
        let err = caller
            .call_with_retry::<Value>(&mut log, PromptRole::StoryArchitect, "open")
            .await
            .unwrap_err();

        assert!(matches!(
            err.root_cause(),
            GenerationError::Transport(TransportError::Timeout { duration_secs: 5 })
        ));
        assert_eq!(log.len(), 2);
    }

    proptest! {
        #[test]
        fn delays_are_non_decreasing_and_capped(
            initial in 0u64..30,
            max in 0u64..60,
            attempts in 1u32..20,
        ) {
            let policy = RetryPolicy::new(attempts, initial, max);
            let delays: Vec<Duration> = (1..=attempts).map(|a| policy.delay_for(a)).collect();
            for pair in delays.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
            for d in &delays {
                prop_assert!(*d <= Duration::from_secs(max));
            }
        }
    }
}
