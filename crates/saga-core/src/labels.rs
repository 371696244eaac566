//! Closed label sets
//!
//! Generation output names modes, roles and conflict types in free text.
//! Each category is parsed once, at construction time, into a closed enum;
//! a label that matches nothing is rejected rather than silently defaulted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A label that matched no known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {category} label: {label:?}")]
pub struct UnknownLabel {
    /// Category name
    pub category: &'static str,
    /// Offending label
    pub label: String,
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase().replace(['-', '_'], " ")
}

fn matches_any(label: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| label.contains(k))
}

/// Narrative mode chosen in phase 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeMode {
    /// Many viewpoints of equal weight
    Ensemble,
    /// One character's inner growth
    PersonalGrowth,
    /// Departure, trials, return
    HerosJourney,
    /// Characters against an abstract force
    AbstractForces,
    /// Mystery and deduction
    Mystery,
    /// Relationship-driven drama
    RelationshipDrama,
}

impl NarrativeMode {
    /// All modes
    pub const ALL: [NarrativeMode; 6] = [
        Self::Ensemble,
        Self::PersonalGrowth,
        Self::HerosJourney,
        Self::AbstractForces,
        Self::Mystery,
        Self::RelationshipDrama,
    ];

    /// Parse a free-text mode label
    ///
    /// # Errors
    /// Returns [`UnknownLabel`] when no mode matches.
    pub fn from_label(label: &str) -> Result<Self, UnknownLabel> {
        let l = normalize(label);
        let mode = if matches_any(&l, &["群像", "ensemble", "multi", "panoram"]) {
            Self::Ensemble
        } else if matches_any(&l, &["英雄", "hero"]) {
            Self::HerosJourney
        } else if matches_any(&l, &["成长", "growth", "coming of age", "personal"]) {
            Self::PersonalGrowth
        } else if matches_any(&l, &["抽象", "abstract", "force", "system"]) {
            Self::AbstractForces
        } else if matches_any(&l, &["悬疑", "推理", "mystery", "detective", "suspense"]) {
            Self::Mystery
        } else if matches_any(&l, &["情感", "关系", "relationship", "romance", "emotional"]) {
            Self::RelationshipDrama
        } else {
            return Err(UnknownLabel {
                category: "narrative mode",
                label: label.to_string(),
            });
        };
        Ok(mode)
    }

    /// Canonical label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ensemble => "ensemble drama",
            Self::PersonalGrowth => "personal growth",
            Self::HerosJourney => "hero's journey",
            Self::AbstractForces => "struggle against abstract forces",
            Self::Mystery => "mystery",
            Self::RelationshipDrama => "relationship drama",
        }
    }
}

/// Narrative function of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterRole {
    /// Lead
    Protagonist,
    /// Opposition
    Antagonist,
    /// Guide
    Mentor,
    /// Contrast to the lead
    Foil,
    /// Everyone else
    Supporting,
}

impl CharacterRole {
    /// Parse a free-text role label
    ///
    /// # Errors
    /// Returns [`UnknownLabel`] when no role matches.
    pub fn from_label(label: &str) -> Result<Self, UnknownLabel> {
        let l = normalize(label);
        let role = if matches_any(&l, &["主角", "protagonist", "hero", "lead", "main character"]) {
            Self::Protagonist
        } else if matches_any(&l, &["反派", "对手", "antagonist", "villain", "rival", "enemy"]) {
            Self::Antagonist
        } else if matches_any(&l, &["导师", "mentor", "guide", "teacher"]) {
            Self::Mentor
        } else if matches_any(&l, &["衬托", "foil", "mirror"]) {
            Self::Foil
        } else if matches_any(
            &l,
            &["配角", "supporting", "support", "ally", "side", "minor", "friend", "companion"],
        ) {
            Self::Supporting
        } else {
            return Err(UnknownLabel {
                category: "character role",
                label: label.to_string(),
            });
        };
        Ok(role)
    }

    /// Canonical label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Protagonist => "protagonist",
            Self::Antagonist => "antagonist",
            Self::Mentor => "mentor",
            Self::Foil => "foil",
            Self::Supporting => "supporting",
        }
    }
}

/// What a conflict sets a character against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Character versus self
    Internal,
    /// Character versus character
    Interpersonal,
    /// Character versus society
    Societal,
    /// Character versus nature
    Nature,
    /// Character versus fate or the supernatural
    Supernatural,
    /// Character versus technology
    Technology,
}

impl ConflictType {
    /// Parse a free-text conflict label
    ///
    /// # Errors
    /// Returns [`UnknownLabel`] when no type matches.
    pub fn from_label(label: &str) -> Result<Self, UnknownLabel> {
        let l = normalize(label);
        let kind = if matches_any(&l, &["与自己", "自我", "内在", "内心", "internal", "self", "inner"]) {
            Self::Internal
        } else if matches_any(&l, &["社会", "society", "societal", "social", "political", "system"]) {
            Self::Societal
        } else if matches_any(&l, &["命运", "超自然", "神", "fate", "supernatural", "god", "cosmic", "destiny"]) {
            Self::Supernatural
        } else if matches_any(&l, &["自然", "nature", "environment", "survival"]) {
            Self::Nature
        } else if matches_any(&l, &["科技", "技术", "technology", "machine", "artificial"]) {
            Self::Technology
        } else if matches_any(&l, &["他人", "人际", "interpersonal", "person", "character", "rival", "other"]) {
            Self::Interpersonal
        } else {
            return Err(UnknownLabel {
                category: "conflict type",
                label: label.to_string(),
            });
        };
        Ok(kind)
    }

    /// Canonical label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Interpersonal => "interpersonal",
            Self::Societal => "societal",
            Self::Nature => "nature",
            Self::Supernatural => "supernatural",
            Self::Technology => "technology",
        }
    }
}

/// Macro structure of the story outline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStructure {
    /// Setup, confrontation, resolution
    #[default]
    ThreeAct,
    /// Departure, initiation, return
    HerosJourney,
}

/// Shape of a character arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcType {
    /// Character changes
    Growth,
    /// Character holds steady and changes the world
    Flat,
}

macro_rules! display_via_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_via_label!(NarrativeMode, CharacterRole, ConflictType);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chinese_and_english_conflict_labels() {
        assert_eq!(ConflictType::from_label("与自己").unwrap(), ConflictType::Internal);
        assert_eq!(ConflictType::from_label("internal").unwrap(), ConflictType::Internal);
        assert_eq!(ConflictType::from_label("Man vs. Society").unwrap(), ConflictType::Societal);
        assert_eq!(
            ConflictType::from_label("person-vs-person").unwrap(),
            ConflictType::Interpersonal
        );
        assert!(ConflictType::from_label("weather report").is_err());
    }

    #[test]
    fn supernatural_is_not_mistaken_for_nature() {
        assert_eq!(ConflictType::from_label("supernatural").unwrap(), ConflictType::Supernatural);
        assert_eq!(ConflictType::from_label("与超自然").unwrap(), ConflictType::Supernatural);
        assert_eq!(ConflictType::from_label("与自然").unwrap(), ConflictType::Nature);
    }

    #[test]
    fn narrative_modes_from_labels() {
        assert_eq!(NarrativeMode::from_label("群像剧").unwrap(), NarrativeMode::Ensemble);
        assert_eq!(NarrativeMode::from_label("Hero's Journey").unwrap(), NarrativeMode::HerosJourney);
        assert_eq!(NarrativeMode::from_label("悬疑推理").unwrap(), NarrativeMode::Mystery);
        let err = NarrativeMode::from_label("cookbook").unwrap_err();
        assert_eq!(err.category, "narrative mode");
    }

    #[test]
    fn canonical_labels_parse_back() {
        for mode in NarrativeMode::ALL {
            assert_eq!(NarrativeMode::from_label(mode.label()).unwrap(), mode);
        }
        for role in [
            CharacterRole::Protagonist,
            CharacterRole::Antagonist,
            CharacterRole::Mentor,
            CharacterRole::Foil,
            CharacterRole::Supporting,
        ] {
            assert_eq!(CharacterRole::from_label(role.label()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(CharacterRole::from_label("narrator's cat").is_err());
    }
}
