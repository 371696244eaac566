//! Evolution orchestrator
//!
//! Drives one [`EvolutionState`] through the six pipeline phases, then serves
//! on-demand chapter detail outlines and blueprint assembly over the finished
//! state.
//!
//! Execution is strictly sequential: one generation call at a time, phases in
//! order, entities within a phase in order.

use crate::blueprint::{assemble_blueprint, NarrativeBlueprint};
use crate::builders::{
    architecture, chapters, characters, conflicts, foreshadow, outline, relationships, scenes,
};
use crate::config::EvolutionConfig;
use crate::error::{EvolutionError, EvolutionResult, StepError};
use crate::heuristics::{chapter_foreshadow_tracking, estimate_chapter_metrics};
use crate::model::{ChapterDetailOutline, ChapterSynopsis, CharacterEvolutionTracker};
use crate::phase::Phase;
use crate::state::{EvolutionState, BLUEPRINT_TAG, CHAPTER_DETAIL_TAG};
use crate::store::NarrativeStore;
use crate::world::WorldSetting;
use saga_generation::RetryingCaller;
use serde_json::json;
use std::sync::Arc;

/// Share of planned chapters with tracked changes, in `[0, 1]`
#[allow(clippy::cast_precision_loss)]
fn arc_progress(tracked: usize, total_chapters: u32) -> f32 {
    if total_chapters == 0 {
        return 0.0;
    }
    (tracked as f32 / total_chapters as f32).clamp(0.0, 1.0)
}

/// Runs evolution phases over a world
pub struct EvolutionOrchestrator {
    /// Single path to the generation port
    caller: RetryingCaller,
    /// Orchestrator settings
    config: EvolutionConfig,
    /// Optional checkpoint and blueprint sink
    store: Option<Arc<dyn NarrativeStore>>,
}

impl std::fmt::Debug for EvolutionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvolutionOrchestrator")
            .field("caller", &self.caller)
            .field("config", &self.config)
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl EvolutionOrchestrator {
    /// Create orchestrator without a store
    #[inline]
    #[must_use]
    pub fn new(caller: RetryingCaller, config: EvolutionConfig) -> Self {
        Self {
            caller,
            config,
            store: None,
        }
    }

    /// Attach a store for checkpoints and blueprints
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn NarrativeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Orchestrator settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Attached store, if any
    #[inline]
    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn NarrativeStore>> {
        self.store.as_ref()
    }

    /// Run phases 1-6 over a fresh state
    ///
    /// `chapter_count` overrides the story-length default. The returned state
    /// is at `Done`.
    ///
    /// # Errors
    /// Returns [`EvolutionError::Phase`] naming the failing phase and step. Use
    /// [`run_pipeline`](Self::run_pipeline) to keep the failed state.
    pub async fn execute_full_evolution(
        &self,
        world: Arc<WorldSetting>,
        chapter_count: Option<u32>,
    ) -> EvolutionResult<EvolutionState> {
        let mut state = EvolutionState::new(world, self.config.max_rounds);
        self.run_pipeline(&mut state, chapter_count).await?;
        Ok(state)
    }

    /// Run phases 1-6 over `state`, which must be at `Init`
    ///
    /// On failure the state is left in `Failed` with a `phase_failed` entry,
    /// and is checkpointed when a store is attached.
    ///
    /// # Errors
    /// See [`execute_full_evolution`](Self::execute_full_evolution).
    pub async fn run_pipeline(
        &self,
        state: &mut EvolutionState,
        chapter_count: Option<u32>,
    ) -> EvolutionResult<()> {
        state.require_phase(Phase::Init)?;
        let chapter_count = self.config.chapter_count(chapter_count);
        tracing::info!(
            "evolution {} starting for world {:?}, {} chapters via {}",
            state.id,
            state.world.name,
            chapter_count,
            self.caller.port_name()
        );

        for phase in Phase::PIPELINE {
            state.begin_phase(phase)?;
            tracing::info!("phase {} started (round {})", phase, state.current_round);

            if let Err(err) = self.run_phase(state, phase, chapter_count).await {
                let err = EvolutionError::phase(phase, err);
                tracing::error!("evolution {} failed: {}", state.id, err);
                state.fail(&err.to_string());
                self.checkpoint(state).await;
                return Err(err);
            }

            state.complete_phase();
            tracing::info!("phase {} completed (round {})", phase, state.current_round);
            if self.config.checkpoint_after_each_phase {
                self.checkpoint(state).await;
            }
        }

        state.finish()?;
        self.checkpoint(state).await;
        tracing::info!(
            "evolution {} done: {} characters, {} conflicts, {} rounds",
            state.id,
            state.characters.len(),
            state.conflicts.len(),
            state.current_round
        );
        Ok(())
    }

    async fn run_phase(
        &self,
        state: &mut EvolutionState,
        phase: Phase,
        chapter_count: u32,
    ) -> Result<(), StepError> {
        let caller = &self.caller;
        match phase {
            Phase::Architecture => {
                let arch = architecture::design_architecture(caller, state).await?;
                state.architecture = Some(arch);
            }
            Phase::CharactersAndRelationships => {
                let total = state.roster().total_characters;
                characters::create_characters(caller, state, total).await?;
                relationships::build_relationship_network(caller, state).await?;
                relationships::project_relationship_evolution(caller, state).await;
                relationships::settle_network(state);
            }
            Phase::Foreshadow => {
                foreshadow::plan_foreshadows(caller, state).await?;
                foreshadow::validate_foreshadows(caller, state).await;
            }
            Phase::Conflicts => {
                conflicts::design_conflicts(caller, state).await?;
                conflicts::classify_conflicts(caller, state).await;
            }
            Phase::GlobalOutline => {
                outline::plan_global_outline(caller, state).await?;
            }
            Phase::ChapterPlan => {
                chapters::assign_chapters(caller, state, chapter_count).await?;
                chapters::refine_chapters(caller, state).await;
            }
            Phase::Init | Phase::Done | Phase::Failed => {}
        }
        Ok(())
    }

    /// Generate (or regenerate) the detail outline of `chapter`
    ///
    /// The result replaces any cached outline for the chapter, and each
    /// character's tracker is updated for this chapter only.
    ///
    /// # Errors
    /// - [`EvolutionError::NotReady`] unless the state is at `Done`
    /// - [`EvolutionError::ChapterNotFound`] when the chapter plan lacks `chapter`
    /// - [`EvolutionError::ChapterDetail`] when a critical call is exhausted
    pub async fn generate_chapter_detail_outline(
        &self,
        state: &mut EvolutionState,
        chapter: u32,
    ) -> EvolutionResult<ChapterDetailOutline> {
        state.require_phase(Phase::Done)?;
        let synopsis = state
            .chapter_plan
            .as_ref()
            .and_then(|p| p.chapter(chapter))
            .cloned()
            .ok_or(EvolutionError::ChapterNotFound(chapter))?;

        tracing::info!("detailing chapter {} {:?}", chapter, synopsis.title);
        state.set_activity(Some(CHAPTER_DETAIL_TAG));
        let result = self.detail_chapter(state, &synopsis).await;
        state.set_activity(None);
        result.map_err(|e| EvolutionError::chapter_detail(chapter, e))
    }

    async fn detail_chapter(
        &self,
        state: &mut EvolutionState,
        synopsis: &ChapterSynopsis,
    ) -> Result<ChapterDetailOutline, StepError> {
        let caller = &self.caller;
        let chapter = synopsis.chapter;
        let sequence = scenes::design_scene_sequence(caller, state, synopsis).await?;

        let guidance = scenes::chapter_guidance(&state.world.style);
        let mut details = Vec::with_capacity(sequence.len());
        for (index, item) in sequence.iter().enumerate() {
            let mut scene = scenes::detail_scene(caller, state, synopsis, item, index).await?;
            scene.guidance = guidance.clone();
            details.push(scene);
        }

        let character_evolution =
            scenes::track_character_evolution(caller, state, chapter, &details).await;
        let foreshadow_tracking = chapter_foreshadow_tracking(&state.foreshadow_plan, chapter);
        let metrics = estimate_chapter_metrics(
            self.config.base_chapter_words,
            self.config.words_per_scene,
            details.len(),
        );

        for tracker in state.character_evolution.values_mut() {
            tracker.forget_chapter(chapter);
        }
        for (id, change) in &character_evolution {
            state
                .character_evolution
                .entry(id.clone())
                .or_insert_with(|| CharacterEvolutionTracker::new(id.clone()))
                .record_chapter(chapter, change.clone());
        }
        let total = state.chapter_plan.as_ref().map_or(0, |p| p.total_chapters);
        for (id, tracker) in &state.character_evolution {
            if let Some(character) = state.characters.get_mut(id) {
                character.arc_progress = arc_progress(tracker.tracked_chapters(), total);
            }
        }

        let outline = ChapterDetailOutline {
            chapter,
            title: synopsis.title.clone(),
            purpose: synopsis.purpose.clone(),
            key_events: synopsis.key_events.clone(),
            scenes: details,
            character_evolution,
            foreshadow_tracking,
            guidance,
            metrics,
        };
        state.log_action(
            "chapter_detailed",
            json!({
                "chapter": chapter,
                "scenes": outline.metrics.scene_count,
                "word_count": outline.metrics.word_count,
            }),
        );
        state.chapter_outlines.insert(chapter, outline.clone());
        Ok(outline)
    }

    /// Assemble the narrative blueprint of a finished run
    ///
    /// `chapter_count` defaults to the chapter plan's total. The blueprint
    /// is saved when a store is attached.
    ///
    /// # Errors
    /// - [`EvolutionError::NotReady`] unless the state is at `Done`
    /// - [`EvolutionError::Store`] when saving fails
    pub async fn create_blueprint(
        &self,
        state: &mut EvolutionState,
        chapter_count: Option<u32>,
    ) -> EvolutionResult<NarrativeBlueprint> {
        state.require_phase(Phase::Done)?;
        let chapter_count = chapter_count
            .or_else(|| state.chapter_plan.as_ref().map(|p| p.total_chapters))
            .unwrap_or_else(|| self.config.chapter_count(None));

        state.set_activity(Some(BLUEPRINT_TAG));
        let blueprint = assemble_blueprint(&self.caller, state, &self.config, chapter_count).await;
        state.set_activity(None);
        tracing::info!(
            "blueprint {} assembled: {} chapters, {} scenes",
            blueprint.id,
            blueprint.chapter_plans.len(),
            blueprint.scenes.len()
        );

        if let Some(store) = &self.store {
            store.save_blueprint(&blueprint).await?;
        }
        Ok(blueprint)
    }

    /// Best-effort checkpoint; a store failure is logged, not raised
    async fn checkpoint(&self, state: &EvolutionState) {
        let Some(store) = &self.store else { return };
        match store.save_checkpoint(state).await {
            Ok(()) => tracing::debug!("checkpoint {} at phase {}", state.id, state.phase()),
            Err(e) => tracing::warn!("checkpoint {} failed: {}", state.id, e),
        }
    }
}
