//! Narrative entities accumulated during a run

pub mod character;
pub mod detail;
pub mod story;

pub use character::{
    ChapterChange, CharacterEvolutionTracker, CharacterId, CharacterState, DesireSystem,
    EmotionalState, Relationship, RelationshipEvolution, RelationshipNetwork, RelationshipState,
    DEFAULT_EMOTION, DEFAULT_EMOTION_INTENSITY,
};
pub use detail::{
    ChapterDetailOutline, ChapterMetrics, ForeshadowTracking, SceneDetail, WritingGuidance,
};
pub use story::{
    ChapterPlan, ChapterSynopsis, CharacterRoster, ConflictHierarchy, ConflictStage,
    ConflictThread, ForeshadowOps, ForeshadowPlan, ForeshadowValidation, GlobalOutline, KeyEvent,
    StoryArchitecture, WorldAnalysis, DEFAULT_CONFLICT_INTENSITY,
};
