//! Phase state machine
//!
//! A run moves strictly forward through six generation phases to `Done`.
//! Any non-terminal phase may drop into `Failed`; there is no rollback.

use crate::error::{EvolutionError, EvolutionResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// State created, nothing generated
    #[default]
    Init,
    /// Narrative mode and roster sizing
    Architecture,
    /// Characters, relationship network, protagonist
    CharactersAndRelationships,
    /// Foreshadow network
    Foreshadow,
    /// Conflict threads
    Conflicts,
    /// Opening, key events, climax
    GlobalOutline,
    /// Events assigned to chapters
    ChapterPlan,
    /// All phases completed
    Done,
    /// A phase failed; terminal
    Failed,
}

impl Phase {
    /// The six generation phases in execution order
    pub const PIPELINE: [Phase; 6] = [
        Self::Architecture,
        Self::CharactersAndRelationships,
        Self::Foreshadow,
        Self::Conflicts,
        Self::GlobalOutline,
        Self::ChapterPlan,
    ];

    /// Snake-case name, also used as the action-log tag
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Architecture => "architecture",
            Self::CharactersAndRelationships => "characters_and_relationships",
            Self::Foreshadow => "foreshadow",
            Self::Conflicts => "conflicts",
            Self::GlobalOutline => "global_outline",
            Self::ChapterPlan => "chapter_plan",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// The phase that follows on success
    #[must_use]
    pub fn next(self) -> Option<Phase> {
        match self {
            Self::Init => Some(Self::Architecture),
            Self::Architecture => Some(Self::CharactersAndRelationships),
            Self::CharactersAndRelationships => Some(Self::Foreshadow),
            Self::Foreshadow => Some(Self::Conflicts),
            Self::Conflicts => Some(Self::GlobalOutline),
            Self::GlobalOutline => Some(Self::ChapterPlan),
            Self::ChapterPlan => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    match from.next() {
        Some(next) => vec![next, Phase::Failed],
        None => vec![],
    }
}

/// Check a single transition
///
/// # Errors
/// Returns [`EvolutionError::IllegalTransition`] when `to` is not reachable
/// from `from`.
pub fn validate_transition(from: Phase, to: Phase) -> EvolutionResult<()> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(EvolutionError::IllegalTransition { from, to })
    }
}

/// Tracks the current phase of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseScheduler {
    current: Phase,
}

impl PhaseScheduler {
    /// Scheduler positioned at `Init`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler resumed at `phase`
    #[inline]
    #[must_use]
    pub fn at(phase: Phase) -> Self {
        Self { current: phase }
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn current(&self) -> Phase {
        self.current
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns [`EvolutionError::IllegalTransition`] for backwards, skipping
    /// or terminal moves.
    pub fn advance(&mut self, to: Phase) -> EvolutionResult<()> {
        validate_transition(self.current, to)?;
        tracing::debug!("phase {} -> {}", self.current, to);
        self.current = to;
        Ok(())
    }

    /// Drop into `Failed`, returning the phase that failed
    ///
    /// Has no effect once terminal.
    pub fn fail(&mut self) -> Phase {
        let failed = self.current;
        if !failed.is_terminal() {
            self.current = Phase::Failed;
        }
        failed
    }

    /// Require that the run has reached `required`
    ///
    /// # Errors
    /// Returns [`EvolutionError::NotReady`] otherwise.
    pub fn require(&self, required: Phase) -> EvolutionResult<()> {
        if self.current == required {
            Ok(())
        } else {
            Err(EvolutionError::NotReady {
                required,
                actual: self.current,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_walks_forward_to_done() {
        let mut scheduler = PhaseScheduler::new();
        for phase in Phase::PIPELINE {
            scheduler.advance(phase).unwrap();
        }
        scheduler.advance(Phase::Done).unwrap();
        assert_eq!(scheduler.current(), Phase::Done);
        assert!(allowed_transitions(Phase::Done).is_empty());
    }

    #[test]
    fn skipping_and_revisiting_are_rejected() {
        let mut scheduler = PhaseScheduler::at(Phase::Foreshadow);
        assert!(matches!(
            scheduler.advance(Phase::GlobalOutline),
            Err(EvolutionError::IllegalTransition { .. })
        ));
        assert!(scheduler.advance(Phase::Architecture).is_err());
        assert_eq!(scheduler.current(), Phase::Foreshadow);
    }

    #[test]
    fn failure_is_terminal() {
        let mut scheduler = PhaseScheduler::at(Phase::Conflicts);
        assert_eq!(scheduler.fail(), Phase::Conflicts);
        assert_eq!(scheduler.current(), Phase::Failed);
        assert!(scheduler.advance(Phase::GlobalOutline).is_err());
        assert_eq!(scheduler.fail(), Phase::Failed);
    }

    #[test]
    fn require_reports_actual_phase() {
        let scheduler = PhaseScheduler::at(Phase::ChapterPlan);
        match scheduler.require(Phase::Done) {
            Err(EvolutionError::NotReady { required, actual }) => {
                assert_eq!(required, Phase::Done);
                assert_eq!(actual, Phase::ChapterPlan);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(
            Phase::CharactersAndRelationships.to_string(),
            "characters_and_relationships"
        );
    }
}
