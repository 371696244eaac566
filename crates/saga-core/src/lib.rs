//! Saga Core - the evolution orchestrator
//!
//! Turns a read-only [`WorldSetting`] into a narrative plan:
//! - [`EvolutionOrchestrator`] runs six ordered phases over one [`EvolutionState`]
//! - [`builders`] issue the generation calls, critical or enrichment tier
//! - [`heuristics`] derive protagonist, structure and foreshadow links from state
//! - [`phase`] holds the forward-only state machine
//! - [`blueprint`] assembles the writer-facing [`NarrativeBlueprint`]
//! - [`store`] persists blueprints, worlds, scenes and checkpoints
//!
//! # Example
//!
//! ```rust,ignore
//! use saga_core::{EvolutionConfig, EvolutionOrchestrator, WorldSetting};
//! use saga_generation::{GenerationConfig, RetryingCaller};
//! use std::sync::Arc;
//!
//! # async fn example(port: Arc<dyn saga_generation::GenerationPort>) -> Result<(), Box<dyn std::error::Error>> {
//! let caller = RetryingCaller::new(port, GenerationConfig::new());
//! let orchestrator = EvolutionOrchestrator::new(caller, EvolutionConfig::new());
//!
//! let world = Arc::new(WorldSetting::new("world_1", "Saltmarsh"));
//! let mut state = orchestrator.execute_full_evolution(world, Some(12)).await?;
//! let outline = orchestrator.generate_chapter_detail_outline(&mut state, 1).await?;
//! let blueprint = orchestrator.create_blueprint(&mut state, None).await?;
//!
//! println!("{} scenes in chapter 1, {} planned", outline.scenes.len(), blueprint.scenes.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod blueprint;
pub mod builders;
pub mod config;
pub mod error;
pub mod heuristics;
pub mod labels;
pub mod model;
pub mod orchestrator;
pub mod phase;
pub mod state;
pub mod store;
pub mod world;

pub use blueprint::{
    assemble_blueprint, ArcPlan, ArcState, ChapterBlueprint, NarrativeBlueprint, PlanStatus,
    SceneInstruction, StoryOutline, ThemePlan,
};
pub use config::{EvolutionConfig, StoryLength};
pub use error::{EvolutionError, EvolutionResult, StepError};
pub use heuristics::{identify_protagonist, protagonist_score, relationship_key, select_structure};
pub use labels::{ArcType, CharacterRole, ConflictType, NarrativeMode, StoryStructure, UnknownLabel};
pub use model::{
    ChapterDetailOutline, ChapterPlan, CharacterId, CharacterState, ConflictThread,
    ForeshadowPlan, GlobalOutline, RelationshipNetwork, SceneDetail, StoryArchitecture,
};
pub use orchestrator::EvolutionOrchestrator;
pub use phase::{allowed_transitions, validate_transition, Phase, PhaseScheduler};
pub use state::{create_evolution_state, ActionLogEntry, EvolutionState, ValidationWarning};
pub use store::{JsonFileStore, MemoryStore, NarrativeStore, RecordKind, SceneOutput, StoreError, StoreResult};
pub use world::WorldSetting;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running an evolution
    pub use crate::{
        EvolutionConfig, EvolutionError, EvolutionOrchestrator, EvolutionResult, EvolutionState,
        NarrativeBlueprint, NarrativeStore, Phase, WorldSetting,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
