//! Entity builders
//!
//! Each builder turns the current state plus a little new context into one or
//! more retrying calls, and maps the decoded responses into entities.
//!
//! Two failure policies apply:
//! - **Critical** builders return `Result<_, StepError>`; an exhausted call
//!   aborts the enclosing phase.
//! - **Enrichment** builders never fail; an exhausted call is logged and a
//!   deterministic fallback from [`enrichment`] is substituted.

pub mod architecture;
pub mod characters;
pub mod chapters;
pub mod conflicts;
pub mod enrichment;
pub mod foreshadow;
pub mod outline;
pub(crate) mod prompts;
pub mod relationships;
pub mod scenes;
pub mod schema;

use crate::error::StepError;
use crate::state::EvolutionState;
use saga_generation::{GenerationError, PromptRole, ResponseSchema, RetryingCaller};
use serde_json::json;

/// Structured call whose failure aborts the phase
pub(crate) async fn critical<T: ResponseSchema>(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    role: PromptRole,
    prompt: &str,
    step: impl Into<String>,
) -> Result<T, StepError> {
    caller
        .call_with_retry::<T>(state, role, prompt)
        .await
        .map_err(|e| StepError::new(step, e))
}

/// Structured call whose failure is absorbed by the caller's fallback
pub(crate) async fn enrich<T: ResponseSchema>(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    role: PromptRole,
    prompt: &str,
) -> Option<T> {
    match caller.call_with_retry::<T>(state, role, prompt).await {
        Ok(value) => Some(value),
        Err(e) => {
            note_fallback(state, role, &e);
            None
        }
    }
}

/// Prose call falling back to `fallback`
pub(crate) async fn enrich_text(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    role: PromptRole,
    prompt: &str,
    fallback: &str,
) -> String {
    match caller.call_text(state, role, prompt).await {
        Ok(text) => text,
        Err(e) => {
            note_fallback(state, role, &e);
            fallback.to_string()
        }
    }
}

fn note_fallback(state: &mut EvolutionState, role: PromptRole, error: &GenerationError) {
    tracing::warn!("{} enrichment failed, using fallback: {}", role, error);
    state.log_action(
        "enrichment_fallback",
        json!({ "role": role, "error": error.to_string() }),
    );
}
