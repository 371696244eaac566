//! Chapter detail outlines

use super::character::{ChapterChange, CharacterId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chapter-level writing guidance applied to every scene
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingGuidance {
    /// Techniques to use
    pub techniques: Vec<String>,
    /// Narrative distance, e.g. close third
    pub narrative_distance: String,
    /// Style hints
    pub style_hints: Vec<String>,
    /// Tone
    pub tone: String,
}

/// One scene of a chapter detail outline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDetail {
    /// 1-based position within the chapter
    pub sequence: u32,
    /// Scene purpose
    pub purpose: String,
    /// Location
    pub location: String,
    /// Time of day or period
    pub time: String,
    /// Point-of-view character id
    pub pov: CharacterId,
    /// Characters present
    pub characters: Vec<CharacterId>,
    /// Main action
    pub main_action: String,
    /// Dialogue focus
    pub dialogue_focus: String,
    /// Character changes keyed by character id
    pub character_deltas: BTreeMap<CharacterId, String>,
    /// Knowledge gained in the scene, keyed by character id
    #[serde(default)]
    pub knowledge_gains: BTreeMap<CharacterId, Vec<String>>,
    /// Internal conflict shift in the scene, keyed by character id
    #[serde(default)]
    pub conflict_shifts: BTreeMap<CharacterId, String>,
    /// Relationship changes keyed by edge key
    pub relationship_deltas: BTreeMap<String, String>,
    /// Foreshadow ids planted
    pub foreshadow_plant: Vec<String>,
    /// Foreshadow ids paid off
    pub foreshadow_payoff: Vec<String>,
    /// Writing constraints
    pub constraints: Vec<String>,
    /// Atmosphere
    pub atmosphere: String,
    /// Guidance, copied from the chapter
    pub guidance: WritingGuidance,
}

/// Foreshadow state of one chapter, by chapter-range membership
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeshadowTracking {
    /// Planted in this chapter
    pub planted: Vec<String>,
    /// Paid off in this chapter
    pub paid_off: Vec<String>,
    /// Planted earlier, paid off later
    pub active: Vec<String>,
}

/// Word estimate for a chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMetrics {
    /// Scenes in the chapter
    pub scene_count: u32,
    /// Estimated words
    pub word_count: u32,
}

/// Scene-level plan for one chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDetailOutline {
    /// Chapter number
    pub chapter: u32,
    /// Title, from the chapter plan
    pub title: String,
    /// Purpose, from the chapter plan
    #[serde(default)]
    pub purpose: String,
    /// Key event ids, from the chapter plan
    #[serde(default)]
    pub key_events: Vec<String>,
    /// Ordered scenes
    pub scenes: Vec<SceneDetail>,
    /// Per-character change in this chapter
    pub character_evolution: BTreeMap<CharacterId, ChapterChange>,
    /// Foreshadow tracking
    pub foreshadow_tracking: ForeshadowTracking,
    /// Writing guidance
    pub guidance: WritingGuidance,
    /// Word estimate
    pub metrics: ChapterMetrics,
}
