//! Typed response schemas
//!
//! One type per builder call. Each is decoded once by the retrying caller and
//! checked by [`ResponseSchema::validate`]; a missing required field or an
//! unknown label is a decode failure, and so a retry, rather than a later
//! surprise.
//!
//! Generated JSON is loose about scalars: numbers arrive as strings, lists
//! arrive as a single string. The [`lenient`] helpers absorb that.

use crate::labels::{CharacterRole, ConflictType, NarrativeMode};
use saga_generation::ResponseSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::BTreeMap;

pub(crate) mod lenient {
    //! Tolerant scalar deserializers

    use serde::de::{self, Deserializer};
    use serde::Deserialize;
    use serde_json::Value;

    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        }
    }

    /// Number or numeric string, rounded and clamped to `u32`
    pub(crate) fn u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(d)?;
        match value {
            Value::Null => Ok(0),
            other => as_f64(&other)
                .map(|f| f.round().clamp(0.0, f64::from(u32::MAX)) as u32)
                .ok_or_else(|| de::Error::custom(format!("expected a number, got {other}"))),
        }
    }

    /// Optional number or numeric string, rounded and clamped to `u8`
    pub(crate) fn opt_u8<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(as_f64(&value).map(|f| f.round().clamp(0.0, 255.0) as u8))
    }

    /// Any scalar rendered as text
    pub(crate) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => String::new(),
            Value::String(s) => s,
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        })
    }

    /// A list of strings, or one string as a single-item list
    pub(crate) fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => Vec::new(),
            Value::String(s) if s.trim().is_empty() => Vec::new(),
            Value::String(s) => vec![s],
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            other => vec![other.to_string()],
        })
    }
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("missing required field `{field}`"))
    } else {
        Ok(())
    }
}

fn require_items<T>(field: &str, items: &[T]) -> Result<(), String> {
    if items.is_empty() {
        Err(format!("`{field}` must not be empty"))
    } else {
        Ok(())
    }
}

// Architecture

/// World analysis
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WorldAnalysisResponse {
    /// Tensions the story can exploit
    #[serde(deserialize_with = "lenient::list")]
    pub core_tensions: Vec<String>,
    /// Story potential
    #[serde(deserialize_with = "lenient::list")]
    pub story_potential: Vec<String>,
    /// Complexity estimate
    #[serde(deserialize_with = "lenient::text")]
    pub complexity: String,
    /// Suggested narrative modes
    #[serde(deserialize_with = "lenient::list")]
    pub suggested_modes: Vec<String>,
}

impl ResponseSchema for WorldAnalysisResponse {}

/// Narrative mode selection
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ModeSelectionResponse {
    /// One of: ensemble drama, personal growth, hero's journey, struggle
    /// against abstract forces, mystery, relationship drama
    pub selected_mode: String,
    /// Why
    #[serde(deserialize_with = "lenient::text")]
    pub reasoning: String,
}

impl ModeSelectionResponse {
    /// Parsed mode; only valid after [`ResponseSchema::validate`]
    #[must_use]
    pub fn mode(&self) -> NarrativeMode {
        NarrativeMode::from_label(&self.selected_mode).unwrap_or(NarrativeMode::Ensemble)
    }
}

impl ResponseSchema for ModeSelectionResponse {
    fn validate(&self) -> Result<(), String> {
        NarrativeMode::from_label(&self.selected_mode)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Character roster sizing
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RosterResponse {
    /// Total characters
    #[serde(deserialize_with = "lenient::u32")]
    pub total_characters: u32,
    /// Protagonists
    #[serde(deserialize_with = "lenient::u32")]
    pub protagonist_count: u32,
    /// Antagonists
    #[serde(deserialize_with = "lenient::u32")]
    pub antagonist_count: u32,
    /// Supporting characters
    #[serde(deserialize_with = "lenient::u32")]
    pub supporting_count: u32,
    /// Network shape, e.g. star, mesh, chain
    #[serde(deserialize_with = "lenient::text")]
    pub network_structure: String,
}

/// Upper bound on the roster size accepted from generation
pub const MAX_ROSTER: u32 = 24;

impl ResponseSchema for RosterResponse {
    fn validate(&self) -> Result<(), String> {
        match self.total_characters {
            0 => Err("`total_characters` must be at least 1".to_string()),
            n if n > MAX_ROSTER => Err(format!("`total_characters` {n} exceeds {MAX_ROSTER}")),
            _ => Ok(()),
        }
    }
}

/// First-pass conflict direction
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConflictDirectionResponse {
    /// Primary conflicts
    #[serde(deserialize_with = "lenient::list")]
    pub primary_conflicts: Vec<String>,
    /// Secondary conflicts
    #[serde(deserialize_with = "lenient::list")]
    pub secondary_conflicts: Vec<String>,
    /// Thematic core
    #[serde(deserialize_with = "lenient::text")]
    pub thematic_core: String,
    /// Overall conflict direction
    #[serde(deserialize_with = "lenient::text")]
    pub conflict_direction: String,
}

impl ResponseSchema for ConflictDirectionResponse {
    fn validate(&self) -> Result<(), String> {
        require("conflict_direction", &self.conflict_direction)
    }
}

/// Refined conflict direction
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConflictDeepeningResponse {
    /// Refined direction
    #[serde(deserialize_with = "lenient::text")]
    pub refined_direction: String,
    /// Layers of the conflict
    #[serde(deserialize_with = "lenient::list")]
    pub conflict_layers: Vec<String>,
}

impl ResponseSchema for ConflictDeepeningResponse {
    fn validate(&self) -> Result<(), String> {
        require("refined_direction", &self.refined_direction)
    }
}

// Characters

/// Basic character information
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CharacterBasicResponse {
    /// Name
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    /// One of: protagonist, antagonist, mentor, foil, supporting
    #[serde(deserialize_with = "lenient::text")]
    pub role: String,
    /// Age
    #[serde(deserialize_with = "lenient::text")]
    pub age: String,
    /// Background
    #[serde(deserialize_with = "lenient::text")]
    pub background: String,
    /// Personality descriptors
    #[serde(deserialize_with = "lenient::list")]
    pub personality: Vec<String>,
    /// Conscious want
    #[serde(deserialize_with = "lenient::text")]
    pub conscious_want: String,
    /// Unconscious need
    #[serde(deserialize_with = "lenient::text")]
    pub unconscious_need: String,
    /// Core traits
    #[serde(deserialize_with = "lenient::list")]
    pub core_traits: Vec<String>,
    /// Flaws
    #[serde(deserialize_with = "lenient::list")]
    pub flaws: Vec<String>,
}

impl CharacterBasicResponse {
    /// Parsed role; only valid after [`ResponseSchema::validate`]
    #[must_use]
    pub fn parsed_role(&self) -> CharacterRole {
        CharacterRole::from_label(&self.role).unwrap_or(CharacterRole::Supporting)
    }
}

impl ResponseSchema for CharacterBasicResponse {
    fn validate(&self) -> Result<(), String> {
        require("name", &self.name)?;
        CharacterRole::from_label(&self.role)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Psychological deepening
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CharacterDepthResponse {
    /// Internal conflicts
    #[serde(deserialize_with = "lenient::list")]
    pub internal_conflicts: Vec<String>,
    /// Secrets
    #[serde(deserialize_with = "lenient::list")]
    pub secrets: Vec<String>,
    /// Fears
    #[serde(deserialize_with = "lenient::list")]
    pub fears: Vec<String>,
    /// Emotional triggers
    #[serde(deserialize_with = "lenient::list")]
    pub triggers: Vec<String>,
    /// Masking behaviours
    #[serde(deserialize_with = "lenient::list")]
    pub masking_behaviors: Vec<String>,
    /// Gap between want and need
    #[serde(deserialize_with = "lenient::text")]
    pub want_vs_need_gap: String,
}

impl ResponseSchema for CharacterDepthResponse {
    fn validate(&self) -> Result<(), String> {
        require_items("internal_conflicts", &self.internal_conflicts)
    }
}

// Relationships

/// One relationship edge
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RelationshipEdgeResponse {
    /// First character id
    pub char_a: String,
    /// Second character id
    pub char_b: String,
    /// Relationship kind
    #[serde(deserialize_with = "lenient::text")]
    pub relation_type: String,
    /// Tension 0-10
    #[serde(deserialize_with = "lenient::opt_u8")]
    pub tension: Option<u8>,
    /// Description of its potential
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    /// Power dynamic
    #[serde(deserialize_with = "lenient::text")]
    pub power_dynamic: String,
    /// Shared history
    #[serde(deserialize_with = "lenient::list")]
    pub shared_history: Vec<String>,
    /// Unspoken tension
    #[serde(deserialize_with = "lenient::list")]
    pub unspoken_tension: Vec<String>,
}

/// Relationship network
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RelationshipNetworkResponse {
    /// Edges
    pub relationships: Vec<RelationshipEdgeResponse>,
}

impl ResponseSchema for RelationshipNetworkResponse {
    fn validate(&self) -> Result<(), String> {
        for (i, edge) in self.relationships.iter().enumerate() {
            require(&format!("relationships[{i}].char_a"), &edge.char_a)?;
            require(&format!("relationships[{i}].char_b"), &edge.char_b)?;
        }
        Ok(())
    }
}

/// Projection for one relationship
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RelationshipEvolutionItem {
    /// Edge key
    pub relation_id: String,
    /// Starting state
    #[serde(deserialize_with = "lenient::text")]
    pub initial_state: String,
    /// Evolution steps
    #[serde(deserialize_with = "lenient::list")]
    pub evolution: Vec<String>,
    /// End state
    #[serde(deserialize_with = "lenient::text")]
    pub final_state: String,
    /// Turning point
    #[serde(deserialize_with = "lenient::text")]
    pub turning_point: String,
}

/// Relationship evolution projection
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RelationshipEvolutionResponse {
    /// Projections
    pub evolutions: Vec<RelationshipEvolutionItem>,
}

impl ResponseSchema for RelationshipEvolutionResponse {}

// Foreshadowing

/// One planned foreshadow
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForeshadowItem {
    /// Identifier
    pub id: String,
    /// Kind
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: String,
    /// The hint
    #[serde(deserialize_with = "lenient::text")]
    pub content: String,
    /// Plant chapter
    #[serde(deserialize_with = "lenient::u32")]
    pub plant_chapter: u32,
    /// Plant scene
    #[serde(deserialize_with = "lenient::u32")]
    pub plant_scene: u32,
    /// Payoff chapter
    #[serde(deserialize_with = "lenient::u32")]
    pub payoff_chapter: u32,
    /// Payoff scene
    #[serde(deserialize_with = "lenient::u32")]
    pub payoff_scene: u32,
    /// Importance
    #[serde(deserialize_with = "lenient::text")]
    pub importance: String,
}

/// Foreshadow network
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForeshadowPlanResponse {
    /// Foreshadows, 5 to 10
    pub foreshadows: Vec<ForeshadowItem>,
}

impl ResponseSchema for ForeshadowPlanResponse {
    fn validate(&self) -> Result<(), String> {
        require_items("foreshadows", &self.foreshadows)?;
        for (i, f) in self.foreshadows.iter().enumerate() {
            require(&format!("foreshadows[{i}].content"), &f.content)?;
        }
        Ok(())
    }
}

/// Foreshadow completeness report
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForeshadowValidationResponse {
    /// Whether the network is complete
    pub is_valid: bool,
    /// Issues
    #[serde(deserialize_with = "lenient::list")]
    pub issues: Vec<String>,
    /// Suggestions
    #[serde(deserialize_with = "lenient::list")]
    pub suggestions: Vec<String>,
    /// Foreshadow ids without payoff
    #[serde(deserialize_with = "lenient::list")]
    pub missing_payoffs: Vec<String>,
}

impl ResponseSchema for ForeshadowValidationResponse {}

// Conflicts

/// One conflict
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConflictDesignResponse {
    /// One of: internal, interpersonal, societal, nature, supernatural, technology
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: String,
    /// Core question
    #[serde(deserialize_with = "lenient::text")]
    pub core_question: String,
    /// Participant character ids
    #[serde(deserialize_with = "lenient::list")]
    pub participants: Vec<String>,
    /// Stakes
    #[serde(deserialize_with = "lenient::text")]
    pub stakes: String,
    /// Intensity 0-10
    #[serde(deserialize_with = "lenient::opt_u8")]
    pub current_intensity: Option<u8>,
}

impl ConflictDesignResponse {
    /// Parsed type; only valid after [`ResponseSchema::validate`]
    #[must_use]
    pub fn parsed_type(&self) -> ConflictType {
        ConflictType::from_label(&self.kind).unwrap_or(ConflictType::Interpersonal)
    }
}

impl ResponseSchema for ConflictDesignResponse {
    fn validate(&self) -> Result<(), String> {
        require("core_question", &self.core_question)?;
        ConflictType::from_label(&self.kind)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// One evolution stage
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConflictStageItem {
    /// Stage name
    #[serde(deserialize_with = "lenient::text")]
    pub stage: String,
    /// Description
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    /// Events
    #[serde(deserialize_with = "lenient::list")]
    pub events: Vec<String>,
    /// Intensity 0-10
    #[serde(deserialize_with = "lenient::opt_u8")]
    pub intensity: Option<u8>,
}

/// Conflict evolution path
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConflictEvolutionResponse {
    /// Ordered stages
    pub stages: Vec<ConflictStageItem>,
}

impl ResponseSchema for ConflictEvolutionResponse {
    fn validate(&self) -> Result<(), String> {
        require_items("stages", &self.stages)
    }
}

/// Conflict tiers
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConflictHierarchyResponse {
    /// Primary conflict ids
    #[serde(deserialize_with = "lenient::list")]
    pub primary_conflicts: Vec<String>,
    /// Secondary conflict ids
    #[serde(deserialize_with = "lenient::list")]
    pub secondary_conflicts: Vec<String>,
    /// Tertiary conflict ids
    #[serde(deserialize_with = "lenient::list")]
    pub tertiary_conflicts: Vec<String>,
    /// How tiers interact
    #[serde(deserialize_with = "lenient::text")]
    pub relationships: String,
}

impl ResponseSchema for ConflictHierarchyResponse {}

// Global outline

/// Opening and direction
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StoryDirectionResponse {
    /// Opening
    #[serde(deserialize_with = "lenient::text")]
    pub opening: String,
    /// Direction
    #[serde(deserialize_with = "lenient::text")]
    pub direction: String,
    /// Themes
    #[serde(deserialize_with = "lenient::list")]
    pub themes: Vec<String>,
}

impl ResponseSchema for StoryDirectionResponse {
    fn validate(&self) -> Result<(), String> {
        require("opening", &self.opening)?;
        require("direction", &self.direction)
    }
}

/// One key event
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct KeyEventItem {
    /// Identifier
    pub id: String,
    /// Name
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    /// Description
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    /// Involved character ids
    #[serde(deserialize_with = "lenient::list")]
    pub characters: Vec<String>,
    /// Consequences
    #[serde(deserialize_with = "lenient::list")]
    pub consequences: Vec<String>,
}

/// Key event sequence
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct KeyEventsResponse {
    /// Ordered events
    pub events: Vec<KeyEventItem>,
}

impl ResponseSchema for KeyEventsResponse {
    fn validate(&self) -> Result<(), String> {
        require_items("events", &self.events)?;
        for (i, e) in self.events.iter().enumerate() {
            if e.name.trim().is_empty() && e.description.trim().is_empty() {
                return Err(format!("events[{i}] has neither name nor description"));
            }
        }
        Ok(())
    }
}

/// Climax and resolution
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ClimaxResponse {
    /// Climax
    #[serde(deserialize_with = "lenient::text")]
    pub climax: String,
    /// Resolution
    #[serde(deserialize_with = "lenient::text")]
    pub resolution: String,
}

impl ResponseSchema for ClimaxResponse {
    fn validate(&self) -> Result<(), String> {
        require("climax", &self.climax)?;
        require("resolution", &self.resolution)
    }
}

// Chapters

/// One chapter assignment
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChapterItem {
    /// 1-based chapter number
    #[serde(deserialize_with = "lenient::u32")]
    pub chapter: u32,
    /// Title
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    /// Summary
    #[serde(deserialize_with = "lenient::text")]
    pub summary: String,
    /// Purpose
    #[serde(deserialize_with = "lenient::text")]
    pub purpose: String,
    /// Key event ids
    #[serde(deserialize_with = "lenient::list")]
    pub key_events: Vec<String>,
    /// Ending hook
    #[serde(deserialize_with = "lenient::text")]
    pub ending_hook: String,
}

/// Chapter assignment
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChapterAssignmentResponse {
    /// Chapters in order
    pub chapters: Vec<ChapterItem>,
}

impl ResponseSchema for ChapterAssignmentResponse {
    fn validate(&self) -> Result<(), String> {
        require_items("chapters", &self.chapters)?;
        if self.chapters.iter().any(|c| c.chapter == 0) {
            return Err("chapter numbers start at 1".to_string());
        }
        Ok(())
    }
}

/// Chapter transition refinement
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChapterRefinementResponse {
    /// Transition notes
    #[serde(deserialize_with = "lenient::list")]
    pub transitions: Vec<String>,
    /// Pacing notes
    #[serde(deserialize_with = "lenient::list")]
    pub pacing: Vec<String>,
    /// Improvements
    #[serde(deserialize_with = "lenient::list")]
    pub improvements: Vec<String>,
}

impl ResponseSchema for ChapterRefinementResponse {}

// Chapter detail

/// One planned scene
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SceneSequenceItem {
    /// 1-based sequence
    #[serde(deserialize_with = "lenient::u32")]
    pub sequence: u32,
    /// Scene type, e.g. dialogue, action, introspection
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: String,
    /// Purpose
    #[serde(deserialize_with = "lenient::text")]
    pub purpose: String,
}

/// Scene sequence of a chapter
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SceneSequenceResponse {
    /// Scenes in order
    pub scenes: Vec<SceneSequenceItem>,
}

impl ResponseSchema for SceneSequenceResponse {
    fn validate(&self) -> Result<(), String> {
        require_items("scenes", &self.scenes)
    }
}

/// A character's change within a scene
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CharacterChangeItem {
    /// Emotional change
    #[serde(deserialize_with = "lenient::text")]
    pub emotional_change: String,
    /// New knowledge or questions
    #[serde(deserialize_with = "lenient::list")]
    pub new_knowledge: Vec<String>,
    /// Internal conflict change
    #[serde(deserialize_with = "lenient::text")]
    pub internal_conflict: String,
}

/// A relationship change within a scene
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RelationshipChangeItem {
    /// Edge key `a_b`
    pub relationship: String,
    /// Kind of change
    #[serde(deserialize_with = "lenient::text")]
    pub change: String,
    /// New tension 0-10
    #[serde(deserialize_with = "lenient::opt_u8")]
    pub new_tension: Option<u8>,
}

/// Foreshadow operation within a scene
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForeshadowOpItem {
    /// Foreshadow id
    pub foreshadow_id: String,
    /// Method
    #[serde(deserialize_with = "lenient::text")]
    pub method: String,
}

/// Scene constraints
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SceneConstraintsItem {
    /// Must include
    #[serde(deserialize_with = "lenient::list")]
    pub must_include: Vec<String>,
    /// Must not reveal
    #[serde(deserialize_with = "lenient::list")]
    pub must_not_reveal: Vec<String>,
    /// Transition hint
    #[serde(deserialize_with = "lenient::text")]
    pub transition_hint: String,
}

/// Scene atmosphere
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SceneAtmosphereItem {
    /// Mood
    #[serde(deserialize_with = "lenient::text")]
    pub mood: String,
    /// Pacing
    #[serde(deserialize_with = "lenient::text")]
    pub pacing: String,
    /// Senses to focus on
    #[serde(deserialize_with = "lenient::list")]
    pub sensory_focus: Vec<String>,
}

/// Detailed scene instruction
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SceneDetailResponse {
    /// Location
    #[serde(deserialize_with = "lenient::text")]
    pub location: String,
    /// Time
    #[serde(deserialize_with = "lenient::text")]
    pub time: String,
    /// Point-of-view character id
    #[serde(deserialize_with = "lenient::text")]
    pub pov_character: String,
    /// Character ids present
    #[serde(deserialize_with = "lenient::list")]
    pub characters: Vec<String>,
    /// Main action
    #[serde(deserialize_with = "lenient::text")]
    pub main_action: String,
    /// Dialogue focus
    #[serde(deserialize_with = "lenient::text")]
    pub dialogue_focus: String,
    /// Character changes keyed by id
    pub character_changes: BTreeMap<String, CharacterChangeItem>,
    /// Relationship changes
    pub relationship_changes: Vec<RelationshipChangeItem>,
    /// Foreshadows planted
    pub foreshadow_plant: Vec<ForeshadowOpItem>,
    /// Foreshadows paid off
    pub foreshadow_payoff: Vec<ForeshadowOpItem>,
    /// Constraints
    pub constraints: SceneConstraintsItem,
    /// Atmosphere
    pub atmosphere: SceneAtmosphereItem,
}

impl ResponseSchema for SceneDetailResponse {
    fn validate(&self) -> Result<(), String> {
        require("location", &self.location)?;
        require("main_action", &self.main_action)
    }
}

/// One character's chapter evolution
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CharacterEvolutionItem {
    /// Character id
    pub character_id: String,
    /// Emotional arc, in order
    #[serde(deserialize_with = "lenient::list")]
    pub emotional_arc: Vec<String>,
    /// Growth summary
    #[serde(deserialize_with = "lenient::text")]
    pub growth_summary: String,
    /// Relationship changes keyed by the other character id
    pub relationship_changes: BTreeMap<String, String>,
    /// Decisive change in the chapter, empty when none
    #[serde(deserialize_with = "lenient::text")]
    pub turning_point: String,
}

/// Chapter character evolution
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CharacterEvolutionResponse {
    /// Per-character entries
    pub evolutions: Vec<CharacterEvolutionItem>,
}

impl ResponseSchema for CharacterEvolutionResponse {}

// Blueprint enrichment

/// One symbol
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SymbolItem {
    /// Symbol
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    /// What it stands for
    #[serde(deserialize_with = "lenient::text")]
    pub meaning: String,
}

/// Symbols for the theme plan
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SymbolsResponse {
    /// Symbols
    pub symbols: Vec<SymbolItem>,
}

impl ResponseSchema for SymbolsResponse {
    fn validate(&self) -> Result<(), String> {
        require_items("symbols", &self.symbols)?;
        for (i, s) in self.symbols.iter().enumerate() {
            require(&format!("symbols[{i}].name"), &s.name)?;
        }
        Ok(())
    }
}

/// Motifs for the theme plan
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MotifsResponse {
    /// Recurring motifs
    #[serde(deserialize_with = "lenient::list")]
    pub motifs: Vec<String>,
}

impl ResponseSchema for MotifsResponse {
    fn validate(&self) -> Result<(), String> {
        require_items("motifs", &self.motifs)
    }
}
