//! Evolution state
//!
//! The single aggregate owned by one run. Phases write into it in order; every
//! generation attempt is one round and one action-log entry. The round counter
//! is telemetry only: exceeding `max_rounds` logs a warning and nothing else.

use crate::config::EvolutionConfig;
use crate::error::EvolutionResult;
use crate::model::{
    ChapterDetailOutline, ChapterPlan, CharacterEvolutionTracker, CharacterId, CharacterRoster,
    CharacterState, ConflictHierarchy, ConflictThread, ForeshadowPlan, ForeshadowValidation,
    GlobalOutline, RelationshipNetwork, StoryArchitecture,
};
use crate::phase::{Phase, PhaseScheduler};
use crate::world::WorldSetting;
use chrono::{DateTime, Utc};
use saga_generation::{AttemptRecord, AuditSink};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Action-log tag used for on-demand chapter detail outlines
pub const CHAPTER_DETAIL_TAG: &str = "chapter_detail";

/// Action-log tag used for blueprint assembly
pub const BLUEPRINT_TAG: &str = "blueprint";

/// Non-fatal finding, logged and recorded but never returned as an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Phase that produced the warning
    pub phase: Phase,
    /// What is wrong
    pub message: String,
}

impl ValidationWarning {
    /// Create warning
    #[inline]
    #[must_use]
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)
    }
}

/// One audit-trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    /// Round at the time of the entry
    pub round: u32,
    /// Phase or activity tag
    pub phase: String,
    /// What happened
    pub description: String,
    /// Structured details
    pub details: Value,
    /// Wall-clock time
    pub at: DateTime<Utc>,
}

/// Everything generated so far in one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionState {
    /// Run identifier
    pub id: String,
    /// Rounds so far; never decreases
    pub current_round: u32,
    /// Soft round cap
    pub max_rounds: u32,
    /// Read-only world input
    pub world: Arc<WorldSetting>,
    scheduler: PhaseScheduler,
    /// Architecture, written in phase 1
    pub architecture: Option<StoryArchitecture>,
    /// Characters by id
    pub characters: BTreeMap<CharacterId, CharacterState>,
    /// Graph view over the characters
    pub relationship_network: RelationshipNetwork,
    /// Foreshadow network
    pub foreshadow_plan: Vec<ForeshadowPlan>,
    /// Latest foreshadow validation report
    pub foreshadow_validation: Option<ForeshadowValidation>,
    /// Conflict threads in creation order
    pub conflicts: Vec<ConflictThread>,
    /// Advisory conflict tiers
    pub conflict_hierarchy: Option<ConflictHierarchy>,
    /// Global outline
    pub global_outline: Option<GlobalOutline>,
    /// Chapter plan
    pub chapter_plan: Option<ChapterPlan>,
    /// Per-character evolution trackers
    pub character_evolution: BTreeMap<CharacterId, CharacterEvolutionTracker>,
    /// Generated chapter detail outlines
    pub chapter_outlines: BTreeMap<u32, ChapterDetailOutline>,
    /// Append-only audit trail
    pub action_log: Vec<ActionLogEntry>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    activity: Option<&'static str>,
}

/// Create a fresh state for one run over `world`
#[must_use]
pub fn create_evolution_state(world: Arc<WorldSetting>, config: &EvolutionConfig) -> EvolutionState {
    EvolutionState::new(world, config.max_rounds)
}

impl EvolutionState {
    /// Create a state at `Init`
    #[must_use]
    pub fn new(world: Arc<WorldSetting>, max_rounds: u32) -> Self {
        Self {
            id: format!("evolution_{}", ulid::Ulid::new()),
            current_round: 0,
            max_rounds,
            world,
            scheduler: PhaseScheduler::new(),
            architecture: None,
            characters: BTreeMap::new(),
            relationship_network: RelationshipNetwork::default(),
            foreshadow_plan: Vec::new(),
            foreshadow_validation: None,
            conflicts: Vec::new(),
            conflict_hierarchy: None,
            global_outline: None,
            chapter_plan: None,
            character_evolution: BTreeMap::new(),
            chapter_outlines: BTreeMap::new(),
            action_log: Vec::new(),
            created_at: Utc::now(),
            activity: None,
        }
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.scheduler.current()
    }

    /// Require that the run has reached `required`
    ///
    /// # Errors
    /// Returns [`EvolutionError::NotReady`](crate::EvolutionError::NotReady) otherwise.
    pub fn require_phase(&self, required: Phase) -> EvolutionResult<()> {
        self.scheduler.require(required)
    }

    /// Enter `phase` and log `phase_started`
    ///
    /// # Errors
    /// Returns [`EvolutionError::IllegalTransition`](crate::EvolutionError::IllegalTransition)
    /// when `phase` does not directly follow the current one.
    pub fn begin_phase(&mut self, phase: Phase) -> EvolutionResult<()> {
        self.scheduler.advance(phase)?;
        self.activity = None;
        self.log_action("phase_started", json!({ "phase": phase }));
        Ok(())
    }

    /// Log `phase_completed` for the current phase
    pub fn complete_phase(&mut self) {
        let phase = self.phase();
        self.log_action("phase_completed", json!({ "phase": phase }));
    }

    /// Move to `Done`
    ///
    /// # Errors
    /// Returns an illegal-transition error unless the chapter plan phase is current.
    pub fn finish(&mut self) -> EvolutionResult<()> {
        self.scheduler.advance(Phase::Done)?;
        self.log_action("evolution_completed", json!({ "rounds": self.current_round }));
        Ok(())
    }

    /// Drop into `Failed`, returning the phase that failed
    pub fn fail(&mut self, reason: &str) -> Phase {
        let failed = self.scheduler.fail();
        self.log_action(
            "phase_failed",
            json!({ "phase": failed, "error": reason }),
        );
        failed
    }

    /// Tag subsequent log entries with `tag` instead of the phase name
    pub fn set_activity(&mut self, tag: Option<&'static str>) {
        self.activity = tag;
    }

    fn tag(&self) -> String {
        self.activity
            .map_or_else(|| self.phase().as_str().to_string(), str::to_string)
    }

    /// Append an action-log entry at the current round
    pub fn log_action(&mut self, description: impl Into<String>, details: Value) {
        self.action_log.push(ActionLogEntry {
            round: self.current_round,
            phase: self.tag(),
            description: description.into(),
            details,
            at: Utc::now(),
        });
    }

    /// Record a non-fatal finding
    pub fn record_warning(&mut self, warning: ValidationWarning) {
        tracing::warn!("validation warning {}", warning);
        let details = json!({ "message": warning.message, "phase": warning.phase });
        self.log_action("validation_warning", details);
    }

    /// Warnings recorded so far
    #[must_use]
    pub fn warnings(&self) -> Vec<&ActionLogEntry> {
        self.action_log
            .iter()
            .filter(|e| e.description == "validation_warning")
            .collect()
    }

    /// Roster from the architecture, or the default roster
    #[must_use]
    pub fn roster(&self) -> CharacterRoster {
        self.architecture
            .as_ref()
            .map(|a| a.roster.clone())
            .unwrap_or_default()
    }

    /// Character names in id order
    #[must_use]
    pub fn character_names(&self) -> Vec<&str> {
        self.characters.values().map(|c| c.name.as_str()).collect()
    }

    /// Display name for `id`, falling back to the id itself
    #[must_use]
    pub fn character_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.characters.get(id).map_or(id, |c| c.name.as_str())
    }

    fn next_round(&mut self) -> u32 {
        self.current_round = self.current_round.saturating_add(1);
        if self.current_round == self.max_rounds.saturating_add(1) {
            tracing::warn!(
                "evolution {} passed its soft round cap of {}",
                self.id,
                self.max_rounds
            );
        }
        self.current_round
    }
}

impl AuditSink for EvolutionState {
    fn record_attempt(&mut self, record: AttemptRecord) {
        self.next_round();
        let description = format!("{} attempt {}/{}", record.role, record.attempt, record.max_attempts);
        let details = serde_json::to_value(&record).unwrap_or(Value::Null);
        self.log_action(description, details);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_generation::{AttemptOutcome, PromptRole};

    fn attempt(n: u32) -> AttemptRecord {
        AttemptRecord {
            role: PromptRole::CharacterCreator,
            attempt: n,
            max_attempts: 3,
            elapsed_ms: 4,
            outcome: AttemptOutcome::Success { strategy: None },
        }
    }

    fn state() -> EvolutionState {
        EvolutionState::new(Arc::new(WorldSetting::new("w", "World")), 2)
    }

    #[test]
    fn every_attempt_is_a_round_and_a_log_entry() {
        let mut state = state();
        state.begin_phase(Phase::Architecture).unwrap();
        let before = state.action_log.len();

        state.record_attempt(attempt(1));
        state.record_attempt(attempt(2));

        assert_eq!(state.current_round, 2);
        assert_eq!(state.action_log.len(), before + 2);
        let last = state.action_log.last().unwrap();
        assert_eq!(last.phase, "architecture");
        assert_eq!(last.round, 2);
        assert_eq!(last.details["attempt"], 2);
    }

    #[test]
    fn exceeding_max_rounds_does_not_stop_counting() {
        let mut state = state();
        for n in 1..=5 {
            state.record_attempt(attempt(n));
        }
        assert_eq!(state.current_round, 5);
    }

    #[test]
    fn activity_tag_overrides_phase_name() {
        let mut state = state();
        state.set_activity(Some(CHAPTER_DETAIL_TAG));
        state.log_action("scene", Value::Null);
        state.set_activity(None);
        state.log_action("after", Value::Null);

        assert_eq!(state.action_log[0].phase, CHAPTER_DETAIL_TAG);
        assert_eq!(state.action_log[1].phase, "init");
    }

    #[test]
    fn warnings_are_recorded_not_raised() {
        let mut state = state();
        state.record_warning(ValidationWarning::new(Phase::Foreshadow, "payoff missing"));
        assert_eq!(state.warnings().len(), 1);
        assert_eq!(state.warnings()[0].details["message"], "payoff missing");
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = state();
        state.begin_phase(Phase::Architecture).unwrap();
        let text = serde_json::to_string(&state).unwrap();
        let back: EvolutionState = serde_json::from_str(&text).unwrap();
        assert_eq!(back.phase(), Phase::Architecture);
        assert_eq!(back.world.name, "World");
    }
}
