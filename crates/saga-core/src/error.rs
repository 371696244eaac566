//! Error types for Saga Core
//!
//! Provides error handling for:
//! - Critical builder failures, wrapped with the phase and step that failed
//! - Out-of-order requests against the phase state machine
//! - Persistence failures

use crate::phase::Phase;
use crate::store::StoreError;
use saga_generation::GenerationError;

/// A critical builder step that could not be completed
#[derive(Debug, Clone, thiserror::Error)]
#[error("{step}: {source}")]
pub struct StepError {
    /// Which entity-creation step failed, e.g. `create character char_2`
    pub step: String,
    /// Underlying generation failure
    #[source]
    pub source: GenerationError,
}

impl StepError {
    /// Create step error
    #[inline]
    #[must_use]
    pub fn new(step: impl Into<String>, source: GenerationError) -> Self {
        Self {
            step: step.into(),
            source,
        }
    }
}

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    /// A critical builder failed inside a phase; the run is aborted
    #[error("phase {phase} failed at {step}: {source}")]
    Phase {
        /// Phase that was running
        phase: Phase,
        /// Entity-creation step
        step: String,
        /// Underlying generation failure
        #[source]
        source: GenerationError,
    },

    /// Operation requires a phase the state has not reached
    #[error("state is in phase {actual}, operation requires {required}")]
    NotReady {
        /// Phase the operation needs
        required: Phase,
        /// Phase the state is in
        actual: Phase,
    },

    /// Requested chapter does not exist in the chapter plan
    #[error("chapter {0} not found in chapter plan")]
    ChapterNotFound(u32),

    /// Illegal phase transition
    #[error("illegal phase transition: {from} -> {to}")]
    IllegalTransition {
        /// Current phase
        from: Phase,
        /// Rejected target
        to: Phase,
    },

    /// A critical call failed while detailing a chapter; the run itself is unaffected
    #[error("chapter {chapter} detail failed at {step}: {source}")]
    ChapterDetail {
        /// Chapter being detailed
        chapter: u32,
        /// Entity-creation step
        step: String,
        /// Underlying generation failure
        #[source]
        source: GenerationError,
    },

    /// Persistence failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EvolutionError {
    /// Wrap a step failure with the phase it happened in
    #[inline]
    #[must_use]
    pub fn phase(phase: Phase, err: StepError) -> Self {
        Self::Phase {
            phase,
            step: err.step,
            source: err.source,
        }
    }

    /// Wrap a step failure from an on-demand chapter detail outline
    #[inline]
    #[must_use]
    pub fn chapter_detail(chapter: u32, err: StepError) -> Self {
        Self::ChapterDetail {
            chapter,
            step: err.step,
            source: err.source,
        }
    }

    /// Phase the failure happened in, if it was a phase failure
    #[inline]
    #[must_use]
    pub fn failed_phase(&self) -> Option<Phase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Check if re-running the phase from scratch may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Phase { .. } | Self::ChapterDetail { .. } | Self::Store(StoreError::Io { .. })
        )
    }
}

/// Result alias for orchestrator operations
pub type EvolutionResult<T> = Result<T, EvolutionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use saga_generation::TransportError;

    #[test]
    fn phase_error_names_phase_and_step() {
        let step = StepError::new(
            "create character char_1",
            GenerationError::Exhausted {
                attempts: 3,
                last: Box::new(TransportError::EmptyResponse.into()),
            },
        );
        let err = EvolutionError::phase(Phase::CharactersAndRelationships, step);
        let text = err.to_string();
        assert!(text.contains("characters_and_relationships"));
        assert!(text.contains("create character char_1"));
        assert!(text.contains("failed after 3 attempts"));
        assert_eq!(err.failed_phase(), Some(Phase::CharactersAndRelationships));
        assert!(err.is_retryable());
    }

    #[test]
    fn chapter_not_found_is_not_retryable() {
        let err = EvolutionError::ChapterNotFound(9);
        assert!(!err.is_retryable());
        assert_eq!(err.failed_phase(), None);
    }
}
