//! Architecture, conflicts, foreshadowing, outline and chapter plan

use super::character::CharacterId;
use crate::labels::{ConflictType, NarrativeMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default conflict intensity on the 0-10 scale
pub const DEFAULT_CONFLICT_INTENSITY: u8 = 7;

/// First-pass reading of the world
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldAnalysis {
    /// Tensions the story can exploit
    pub core_tensions: Vec<String>,
    /// Story potential
    pub story_potential: String,
    /// Complexity estimate
    pub complexity: String,
    /// Modes the analysis suggested
    pub suggested_modes: Vec<String>,
}

/// Character counts by role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRoster {
    /// Total characters to create
    pub total_characters: u32,
    /// Protagonists
    pub protagonists: u32,
    /// Antagonists
    pub antagonists: u32,
    /// Supporting cast
    pub supporting: u32,
    /// Relationship network shape
    pub network_type: String,
}

impl Default for CharacterRoster {
    fn default() -> Self {
        Self {
            total_characters: 3,
            protagonists: 1,
            antagonists: 1,
            supporting: 1,
            network_type: "star".to_string(),
        }
    }
}

/// Written once in the architecture phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryArchitecture {
    /// Selected narrative mode
    pub narrative_mode: NarrativeMode,
    /// Why the mode was chosen
    pub mode_rationale: String,
    /// Refined core conflict direction
    pub core_conflict_type: String,
    /// Thematic core
    pub thematic_core: String,
    /// Roster sizing
    pub roster: CharacterRoster,
    /// World analysis
    pub world_analysis: WorldAnalysis,
}

/// One stage of a conflict's evolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictStage {
    /// Stage name
    pub stage: String,
    /// Intensity 0-10
    pub intensity: u8,
    /// What happens
    pub description: String,
    /// Concrete events
    pub events: Vec<String>,
}

/// A tracked conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictThread {
    /// Identifier, `conflict_{n}`
    pub id: String,
    /// Conflict type
    pub conflict_type: ConflictType,
    /// The question the conflict asks
    pub core_question: String,
    /// Participating character ids
    pub participants: Vec<CharacterId>,
    /// What is at stake
    pub stakes: String,
    /// Ordered evolution stages
    pub evolution_path: Vec<ConflictStage>,
    /// Whether the conflict is resolved
    pub resolved: bool,
    /// Current intensity 0-10, used for ranking
    pub intensity: u8,
}

impl ConflictThread {
    /// Whether `character` takes part
    #[inline]
    #[must_use]
    pub fn involves(&self, character: &str) -> bool {
        self.participants.iter().any(|p| p == character)
    }
}

/// Advisory tiering of conflicts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictHierarchy {
    /// Primary conflict ids
    pub primary: Vec<String>,
    /// Secondary conflict ids
    pub secondary: Vec<String>,
    /// Tertiary conflict ids
    pub tertiary: Vec<String>,
    /// How the tiers interact
    pub interplay: String,
}

/// A planned plant/payoff pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeshadowPlan {
    /// Identifier, `foreshadow_{n}` unless generated
    pub id: String,
    /// The hint itself
    pub content: String,
    /// Kind, e.g. object, dialogue, prophecy
    pub kind: String,
    /// Chapter the hint is planted in
    pub plant_chapter: u32,
    /// Scene the hint is planted in
    pub plant_scene: u32,
    /// Chapter the hint pays off in
    pub payoff_chapter: u32,
    /// Scene the hint pays off in
    pub payoff_scene: u32,
    /// Importance label
    pub importance: String,
}

impl ForeshadowPlan {
    /// Payoff scheduled before the plant
    #[inline]
    #[must_use]
    pub fn pays_off_early(&self) -> bool {
        self.payoff_chapter < self.plant_chapter
    }
}

/// Completeness report on the foreshadow network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeshadowValidation {
    /// Whether the network is complete
    pub complete: bool,
    /// Problems found
    pub issues: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Foreshadow ids with no usable payoff
    pub missing_payoffs: Vec<String>,
}

/// One key event of the global outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Identifier, `event_{n}` unless generated
    pub id: String,
    /// 1-based order
    pub sequence: u32,
    /// Short name
    pub name: String,
    /// What happens
    pub description: String,
    /// Involved character ids
    pub participants: Vec<CharacterId>,
    /// What it changes
    pub consequences: Vec<String>,
}

/// Whole-story outline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalOutline {
    /// Opening situation
    pub opening: String,
    /// Overall direction
    pub main_direction: String,
    /// Ordered key events
    pub key_events: Vec<KeyEvent>,
    /// Climax
    pub climax: String,
    /// Resolution
    pub resolution: String,
    /// Event id to linked foreshadow id
    pub event_foreshadows: BTreeMap<String, String>,
}

/// Foreshadow operations scheduled in one chapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeshadowOps {
    /// Foreshadow ids planted here
    pub plant: Vec<String>,
    /// Foreshadow ids paid off here
    pub payoff: Vec<String>,
}

/// One chapter of the chapter plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSynopsis {
    /// 1-based chapter number
    pub chapter: u32,
    /// Title
    pub title: String,
    /// Summary
    pub summary: String,
    /// Narrative purpose
    pub purpose: String,
    /// Key event ids assigned to this chapter
    pub key_events: Vec<String>,
    /// Foreshadow operations
    pub foreshadows: ForeshadowOps,
    /// Closing hook
    pub ending_hook: String,
}

/// Events distributed over chapters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterPlan {
    /// Requested chapter count
    pub total_chapters: u32,
    /// Ordered synopses
    pub chapters: Vec<ChapterSynopsis>,
    /// Advisory transition notes
    pub refinement_notes: Vec<String>,
}

impl ChapterPlan {
    /// Synopsis for `chapter`
    #[must_use]
    pub fn chapter(&self, chapter: u32) -> Option<&ChapterSynopsis> {
        self.chapters.iter().find(|c| c.chapter == chapter)
    }
}
