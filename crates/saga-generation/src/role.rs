//! Prompt roles
//!
//! Every generation call is issued on behalf of one role. The role fixes the
//! system payload and the default sampling parameters; configuration may
//! override sampling per role but can never introduce an unknown role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling parameters for one call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    /// Sampling temperature, clamped to `[0, 2]`
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl Sampling {
    /// Create sampling parameters
    #[inline]
    #[must_use]
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: temperature.clamp(0.0, 2.0),
            max_tokens,
        }
    }
}

impl Default for Sampling {
    fn default() -> Self {
        Self::new(0.7, 2000)
    }
}

/// Closed set of generation roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRole {
    /// Reads the world and surfaces story potential
    StoryArchitectureAnalyzer,
    /// Picks the narrative mode
    NarrativeModeSelector,
    /// Sizes the cast
    CharacterRosterPlanner,
    /// Sets the core conflict direction
    ConflictArchitect,
    /// Creates a character's surface identity
    CharacterCreator,
    /// Deepens a character's inner life
    CharacterPsychologist,
    /// Builds the relationship graph
    RelationshipArchitect,
    /// Projects how relationships change
    RelationshipEvolutionist,
    /// Plans foreshadowing
    ForeshadowArchitect,
    /// Checks foreshadowing completeness
    ForeshadowValidator,
    /// Designs a conflict thread
    ConflictDesigner,
    /// Designs a conflict's evolution path
    ConflictEvolutionist,
    /// Ranks conflicts into tiers
    ConflictHierarchist,
    /// Plans the opening and direction
    StoryArchitect,
    /// Plans key events
    PlotDesigner,
    /// Plans the climax and resolution
    ClimaxDesigner,
    /// Assigns events to chapters
    ChapterPlanner,
    /// Smooths chapter transitions
    ChapterRefiner,
    /// Lays out a chapter's scenes
    SceneSequenceDesigner,
    /// Details a single scene
    SceneDetailDesigner,
    /// Tracks per-chapter character change
    CharacterEvolutionTracker,
    /// Writes story-structure beats
    StructureDesigner,
    /// Designs symbols and motifs
    ThemeDesigner,
    /// Writes scene purpose and action prose
    SceneDesigner,
    /// Describes character change at turning points
    ArcDesigner,
}

impl PromptRole {
    /// All roles, in pipeline order
    pub const ALL: [PromptRole; 25] = [
        Self::StoryArchitectureAnalyzer,
        Self::NarrativeModeSelector,
        Self::CharacterRosterPlanner,
        Self::ConflictArchitect,
        Self::CharacterCreator,
        Self::CharacterPsychologist,
        Self::RelationshipArchitect,
        Self::RelationshipEvolutionist,
        Self::ForeshadowArchitect,
        Self::ForeshadowValidator,
        Self::ConflictDesigner,
        Self::ConflictEvolutionist,
        Self::ConflictHierarchist,
        Self::StoryArchitect,
        Self::PlotDesigner,
        Self::ClimaxDesigner,
        Self::ChapterPlanner,
        Self::ChapterRefiner,
        Self::SceneSequenceDesigner,
        Self::SceneDetailDesigner,
        Self::CharacterEvolutionTracker,
        Self::StructureDesigner,
        Self::ThemeDesigner,
        Self::SceneDesigner,
        Self::ArcDesigner,
    ];

    /// Stable snake_case name, as used in configuration
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoryArchitectureAnalyzer => "story_architecture_analyzer",
            Self::NarrativeModeSelector => "narrative_mode_selector",
            Self::CharacterRosterPlanner => "character_roster_planner",
            Self::ConflictArchitect => "conflict_architect",
            Self::CharacterCreator => "character_creator",
            Self::CharacterPsychologist => "character_psychologist",
            Self::RelationshipArchitect => "relationship_architect",
            Self::RelationshipEvolutionist => "relationship_evolutionist",
            Self::ForeshadowArchitect => "foreshadow_architect",
            Self::ForeshadowValidator => "foreshadow_validator",
            Self::ConflictDesigner => "conflict_designer",
            Self::ConflictEvolutionist => "conflict_evolutionist",
            Self::ConflictHierarchist => "conflict_hierarchist",
            Self::StoryArchitect => "story_architect",
            Self::PlotDesigner => "plot_designer",
            Self::ClimaxDesigner => "climax_designer",
            Self::ChapterPlanner => "chapter_planner",
            Self::ChapterRefiner => "chapter_refiner",
            Self::SceneSequenceDesigner => "scene_sequence_designer",
            Self::SceneDetailDesigner => "scene_detail_designer",
            Self::CharacterEvolutionTracker => "character_evolution_tracker",
            Self::StructureDesigner => "structure_designer",
            Self::ThemeDesigner => "theme_designer",
            Self::SceneDesigner => "scene_designer",
            Self::ArcDesigner => "arc_designer",
        }
    }

    /// System payload sent with every call for this role
    #[must_use]
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::StoryArchitectureAnalyzer => {
                "You are a story architect. You read a world setting and identify the tensions, \
                 scale and story potential it offers."
            }
            Self::NarrativeModeSelector => {
                "You are a story architect. You choose the narrative mode that best fits a world \
                 and explain the trade-offs."
            }
            Self::CharacterRosterPlanner => {
                "You are a casting director for fiction. You size a cast and shape its network."
            }
            Self::ConflictArchitect => {
                "You are a conflict architect. You find the conflicts a world makes inevitable \
                 and the thematic question they serve."
            }
            Self::CharacterCreator => {
                "You are a character designer. You create characters with clear wants, hidden \
                 needs and real flaws."
            }
            Self::CharacterPsychologist => {
                "You are a character psychologist. You uncover internal conflicts, secrets, \
                 fears and the gap between want and need."
            }
            Self::RelationshipArchitect => {
                "You are a relationship architect. You connect characters through tension, \
                 power and shared history."
            }
            Self::RelationshipEvolutionist => {
                "You are a relationship analyst. You project how each relationship changes \
                 across a story."
            }
            Self::ForeshadowArchitect => {
                "You are a foreshadowing designer. You plant hints early and pay them off \
                 deliberately later."
            }
            Self::ForeshadowValidator => {
                "You are a continuity editor. You check that every plant has a payoff and \
                 that payoffs come after plants."
            }
            Self::ConflictDesigner => {
                "You are a conflict designer. You define what is at stake and who is involved."
            }
            Self::ConflictEvolutionist => {
                "You are a conflict designer. You lay out how a conflict escalates stage by stage."
            }
            Self::ConflictHierarchist => {
                "You are a story editor. You rank conflicts into primary, secondary and \
                 tertiary threads."
            }
            Self::StoryArchitect => {
                "You are a story architect. You plan openings that set direction and theme."
            }
            Self::PlotDesigner => {
                "You are a plot designer. You place the key events that carry a story."
            }
            Self::ClimaxDesigner => {
                "You are a plot designer. You build climaxes where every thread converges."
            }
            Self::ChapterPlanner => {
                "You are a chapter planner. You distribute events across chapters with a clear \
                 purpose for each."
            }
            Self::ChapterRefiner => {
                "You are a structural editor. You smooth transitions and pacing between chapters."
            }
            Self::SceneSequenceDesigner => {
                "You are a scene planner. You break a chapter into a sequence of purposeful scenes."
            }
            Self::SceneDetailDesigner => {
                "You are a scene designer. You give a writer everything needed to draft one scene."
            }
            Self::CharacterEvolutionTracker => {
                "You are a continuity editor. You track how each character changes within a chapter."
            }
            Self::StructureDesigner => {
                "You are a story structure expert. You write the decisive beats of a story."
            }
            Self::ThemeDesigner => {
                "You are a theme designer. You create symbols and recurring motifs that carry \
                 a story's theme."
            }
            Self::SceneDesigner => {
                "You are a scene designer. You state why a scene exists and what happens in it."
            }
            Self::ArcDesigner => {
                "You are a character arc designer. You describe how an event changes a character."
            }
        }
    }

    /// Built-in sampling for this role
    #[must_use]
    pub fn default_sampling(self) -> Sampling {
        match self {
            Self::ForeshadowValidator | Self::ConflictHierarchist | Self::ChapterRefiner => {
                Sampling::new(0.3, 1500)
            }
            Self::CharacterRosterPlanner | Self::ChapterPlanner | Self::SceneSequenceDesigner => {
                Sampling::new(0.5, 3000)
            }
            Self::CharacterCreator
            | Self::CharacterPsychologist
            | Self::StructureDesigner
            | Self::ThemeDesigner
            | Self::SceneDesigner
            | Self::ArcDesigner => Sampling::new(0.8, 2000),
            Self::RelationshipArchitect | Self::ForeshadowArchitect | Self::PlotDesigner => {
                Sampling::new(0.7, 4000)
            }
            _ => Sampling::default(),
        }
    }
}

impl fmt::Display for PromptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_role_has_a_distinct_system_prompt() {
        let prompts: HashSet<_> = PromptRole::ALL.iter().map(|r| r.system_prompt()).collect();
        assert_eq!(prompts.len(), PromptRole::ALL.len());
    }

    #[test]
    fn serde_name_matches_as_str() {
        for role in PromptRole::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }

    #[test]
    fn sampling_temperature_is_clamped() {
        assert_eq!(Sampling::new(3.5, 10).temperature, 2.0);
        assert_eq!(Sampling::new(-1.0, 10).temperature, 0.0);
    }
}
