//! Characters, relationships and per-chapter evolution

use crate::labels::CharacterRole;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Character identifier, `char_{n}`
pub type CharacterId = String;

/// Default emotion of a freshly created character
pub const DEFAULT_EMOTION: &str = "calm";

/// Default emotional intensity of a freshly created character
pub const DEFAULT_EMOTION_INTENSITY: u8 = 50;

/// What a character wants and what they need
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesireSystem {
    /// What the character believes they want
    pub conscious_want: String,
    /// What the character actually needs
    pub unconscious_need: String,
    /// Fears, joined into one line
    pub fear: String,
    /// How far apart want and need are
    pub want_need_gap: String,
}

/// Emotional state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalState {
    /// Dominant emotion
    pub current_emotion: String,
    /// Intensity 0-100
    pub intensity: u8,
    /// What sets the character off
    pub triggers: Vec<String>,
    /// How the character hides what they feel
    pub masking_behaviors: Vec<String>,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            current_emotion: DEFAULT_EMOTION.to_string(),
            intensity: DEFAULT_EMOTION_INTENSITY,
            triggers: Vec::new(),
            masking_behaviors: Vec::new(),
        }
    }
}

/// One side's view of a relationship
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipState {
    /// Relationship kind, e.g. ally, rival
    pub relation_type: String,
    /// Tension 0-10
    pub tension: u8,
    /// Who holds power
    pub power_dynamic: String,
    /// Shared past
    pub shared_history: Vec<String>,
    /// What is left unsaid
    pub unspoken_tension: Vec<String>,
}

/// A generated character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    /// Identifier
    pub id: CharacterId,
    /// Name
    pub name: String,
    /// Narrative role
    pub role: CharacterRole,
    /// Age, free text
    pub age: String,
    /// Background
    pub background: String,
    /// Personality summary
    pub personality: String,
    /// Core traits
    pub core_traits: Vec<String>,
    /// Flaws
    pub flaws: Vec<String>,
    /// Desire system
    pub desires: DesireSystem,
    /// Emotional system
    pub emotions: EmotionalState,
    /// Internal conflicts
    pub internal_conflicts: Vec<String>,
    /// Secrets
    pub secrets: Vec<String>,
    /// Relationships keyed by the other character's id
    pub relationships: BTreeMap<CharacterId, RelationshipState>,
    /// Arc progress 0.0-1.0
    pub arc_progress: f32,
}

impl CharacterState {
    /// Create a character with default emotional state
    #[must_use]
    pub fn new(id: impl Into<CharacterId>, name: impl Into<String>, role: CharacterRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            age: String::new(),
            background: String::new(),
            personality: String::new(),
            core_traits: Vec::new(),
            flaws: Vec::new(),
            desires: DesireSystem::default(),
            emotions: EmotionalState::default(),
            internal_conflicts: Vec::new(),
            secrets: Vec::new(),
            relationships: BTreeMap::new(),
            arc_progress: 0.0,
        }
    }
}

/// Canonical edge of the relationship network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// One endpoint
    pub from: CharacterId,
    /// Other endpoint
    pub to: CharacterId,
    /// Relationship kind
    pub relation_type: String,
    /// Tension 0-10
    pub tension: u8,
    /// Where the relationship could go
    pub potential: String,
    /// Where it is now
    pub current_state: String,
}

/// Advisory projection of how one relationship changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEvolution {
    /// Edge key
    pub relation_id: String,
    /// Starting point
    pub initial_state: String,
    /// How it changes
    pub evolution: String,
    /// End point
    pub final_state: String,
    /// What flips it
    pub turning_point: String,
}

/// Graph view over the characters
///
/// Nodes are character ids; the characters themselves live only in the
/// state's character map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipNetwork {
    /// Character ids
    pub nodes: Vec<CharacterId>,
    /// Edges keyed by the symmetric pair key
    pub edges: IndexMap<String, Relationship>,
    /// Network shape, e.g. star, mesh
    pub network_type: String,
    /// Protagonist, once identified
    pub center_node: Option<CharacterId>,
    /// Advisory evolution projections
    pub evolution_stages: Vec<RelationshipEvolution>,
}

/// How a character changed within one chapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterChange {
    /// Emotional arc across the chapter
    pub emotional_arc: String,
    /// Growth summary
    pub growth_summary: String,
    /// Relationship changes keyed by the other character
    pub relationship_changes: BTreeMap<String, String>,
    /// Things learned across the chapter's scenes
    #[serde(default)]
    pub new_knowledge: Vec<String>,
    /// Internal conflict shifts across the chapter's scenes
    #[serde(default)]
    pub internal_conflict: Vec<String>,
    /// Decisive change in this chapter, if any
    #[serde(default)]
    pub turning_point: Option<String>,
}

/// Incremental record of a character's evolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterEvolutionTracker {
    /// Tracked character
    pub character_id: CharacterId,
    /// Emotions in chapter order
    pub emotional_journey: Vec<String>,
    /// Relationship notes keyed by the other character
    pub relationship_history: BTreeMap<CharacterId, Vec<String>>,
    /// Things learned
    pub knowledge_growth: Vec<String>,
    /// Internal conflict notes
    pub internal_conflict_progress: Vec<String>,
    /// Turning points
    pub turning_points: Vec<String>,
    /// Per-chapter changes, keyed by chapter number
    pub chapter_changes: BTreeMap<u32, ChapterChange>,
}

impl CharacterEvolutionTracker {
    /// Create an empty tracker
    #[inline]
    #[must_use]
    pub fn new(character_id: impl Into<CharacterId>) -> Self {
        Self {
            character_id: character_id.into(),
            ..Self::default()
        }
    }

    /// Record (or replace) the change for `chapter`
    pub fn record_chapter(&mut self, chapter: u32, change: ChapterChange) {
        self.chapter_changes.insert(chapter, change);
        self.rebuild();
    }

    /// Drop whatever was recorded for `chapter`
    pub fn forget_chapter(&mut self, chapter: u32) -> Option<ChapterChange> {
        let removed = self.chapter_changes.remove(&chapter);
        if removed.is_some() {
            self.rebuild();
        }
        removed
    }

    /// Chapters with a recorded change
    #[inline]
    #[must_use]
    pub fn tracked_chapters(&self) -> usize {
        self.chapter_changes.len()
    }

    // Every derived list is a pure function of `chapter_changes`, in chapter order.
    fn rebuild(&mut self) {
        self.emotional_journey.clear();
        self.relationship_history.clear();
        self.knowledge_growth.clear();
        self.internal_conflict_progress.clear();
        self.turning_points.clear();

        for (chapter, change) in &self.chapter_changes {
            self.emotional_journey.push(change.emotional_arc.clone());
            for (other, note) in &change.relationship_changes {
                self.relationship_history
                    .entry(other.clone())
                    .or_default()
                    .push(format!("chapter {chapter}: {note}"));
            }
            self.knowledge_growth
                .extend(change.new_knowledge.iter().map(|k| format!("chapter {chapter}: {k}")));
            self.internal_conflict_progress
                .extend(change.internal_conflict.iter().map(|c| format!("chapter {chapter}: {c}")));
            if let Some(point) = &change.turning_point {
                self.turning_points.push(format!("chapter {chapter}: {point}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_character_has_default_emotion() {
        let c = CharacterState::new("char_0", "Mira", CharacterRole::Protagonist);
        assert_eq!(c.emotions.current_emotion, DEFAULT_EMOTION);
        assert_eq!(c.emotions.intensity, 50);
        assert!(c.relationships.is_empty());
    }

    #[test]
    fn recording_a_chapter_twice_replaces_it() {
        let mut tracker = CharacterEvolutionTracker::new("char_0");
        let change = |arc: &str| ChapterChange {
            emotional_arc: arc.into(),
            ..ChapterChange::default()
        };

        tracker.record_chapter(2, change("doubt"));
        tracker.record_chapter(1, change("hope"));
        tracker.record_chapter(2, change("resolve"));

        assert_eq!(tracker.chapter_changes.len(), 2);
        assert_eq!(tracker.emotional_journey, vec!["hope", "resolve"]);
    }

    #[test]
    fn rerecording_a_chapter_does_not_duplicate_history() {
        let mut tracker = CharacterEvolutionTracker::new("char_0");
        let mut change = ChapterChange {
            emotional_arc: "anger".into(),
            new_knowledge: vec!["the charter is forged".into()],
            internal_conflict: vec!["duty against kin".into()],
            turning_point: Some("breaks with the guild".into()),
            ..ChapterChange::default()
        };
        change
            .relationship_changes
            .insert("char_1".into(), "trust breaks".into());

        tracker.record_chapter(1, change.clone());
        tracker.record_chapter(1, change);

        assert_eq!(tracker.relationship_history["char_1"], vec!["chapter 1: trust breaks"]);
        assert_eq!(tracker.knowledge_growth, vec!["chapter 1: the charter is forged"]);
        assert_eq!(tracker.internal_conflict_progress, vec!["chapter 1: duty against kin"]);
        assert_eq!(tracker.turning_points, vec!["chapter 1: breaks with the guild"]);
    }

    #[test]
    fn forgetting_a_chapter_clears_its_history() {
        let mut tracker = CharacterEvolutionTracker::new("char_0");
        let mut change = ChapterChange::default();
        change
            .relationship_changes
            .insert("char_1".into(), "trust breaks".into());
        tracker.record_chapter(3, change);

        assert!(tracker.forget_chapter(3).is_some());
        assert!(tracker.forget_chapter(3).is_none());
        assert!(tracker.relationship_history.is_empty());
        assert!(tracker.emotional_journey.is_empty());
        assert_eq!(tracker.tracked_chapters(), 0);
    }
}
