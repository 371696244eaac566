//! World setting input
//!
//! The orchestrator reads a fully built world as context and never mutates it.
//! Only the parts the narrative pipeline consumes are modelled; unknown fields
//! in the input are ignored.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// World genre
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldType {
    /// High or low fantasy
    #[default]
    Fantasy,
    /// Science fiction
    Scifi,
    /// Historical
    Historical,
    /// Contemporary urban
    Urban,
    /// Martial arts
    Wuxia,
    /// Cultivation fantasy
    Xianxia,
    /// Blend of genres
    Mixed,
}

/// World scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldScale {
    /// Village
    Village,
    /// City
    #[default]
    City,
    /// Nation
    Nation,
    /// Continent
    Continent,
    /// Planet
    Planet,
    /// Universe
    Universe,
}

/// Philosophical layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Philosophy {
    /// The question the world keeps asking
    pub core_question: String,
    /// Themes the world explores
    pub themes: Vec<String>,
    /// Dominant values
    pub values: Vec<String>,
}

/// A geographic region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    /// Identifier
    pub id: String,
    /// Name
    pub name: String,
    /// Terrain kind, e.g. mountain, river
    #[serde(rename = "type")]
    pub kind: String,
    /// Description
    pub description: String,
}

/// Geography layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geography {
    /// Regions
    pub regions: Vec<Region>,
}

/// A people of the world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Race {
    /// Identifier
    pub id: String,
    /// Name
    pub name: String,
    /// Description
    pub description: String,
    /// Characteristic traits
    pub traits: Vec<String>,
}

/// Civilization layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Civilization {
    /// Races
    pub races: Vec<Race>,
}

/// A standing tension in society
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocietalConflict {
    /// Name
    pub name: String,
    /// Kind, e.g. class, religious
    #[serde(rename = "type")]
    pub kind: String,
    /// Description
    pub description: String,
    /// Parties involved
    pub parties: Vec<String>,
}

/// Society layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Society {
    /// Political system
    pub politics: String,
    /// Social classes
    pub classes: Vec<String>,
    /// Standing conflicts
    pub conflicts: Vec<SocietalConflict>,
}

/// Story hooks prepared by world building
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorySoil {
    /// Social tensions ready to ignite
    pub tensions: Vec<String>,
    /// Plot hooks
    pub plot_hooks: Vec<String>,
}

/// Read-only world input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSetting {
    /// Identifier
    pub id: String,
    /// Name
    pub name: String,
    /// Genre
    #[serde(rename = "type")]
    pub world_type: WorldType,
    /// Scale
    pub scale: WorldScale,
    /// Stylistic leaning
    pub style: String,
    /// Philosophy
    pub philosophy: Philosophy,
    /// Geography
    pub geography: Geography,
    /// Civilization
    pub civilization: Civilization,
    /// Society
    pub society: Society,
    /// Story soil
    pub story_soil: StorySoil,
}

impl WorldSetting {
    /// Create a world with a name and id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Compact textual summary used as prompt context
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "World: {} ({:?}, {:?} scale)", self.name, self.world_type, self.scale);
        if !self.style.is_empty() {
            let _ = writeln!(out, "Style: {}", self.style);
        }
        if !self.philosophy.core_question.is_empty() {
            let _ = writeln!(out, "Core question: {}", self.philosophy.core_question);
        }
        if !self.philosophy.themes.is_empty() {
            let _ = writeln!(out, "Themes: {}", self.philosophy.themes.join(", "));
        }
        for region in &self.geography.regions {
            let _ = writeln!(out, "Region: {} [{}] {}", region.name, region.kind, region.description);
        }
        for race in &self.civilization.races {
            let _ = writeln!(out, "People: {} - {}", race.name, race.description);
        }
        if !self.society.politics.is_empty() {
            let _ = writeln!(out, "Politics: {}", self.society.politics);
        }
        for conflict in &self.society.conflicts {
            let _ = writeln!(
                out,
                "Social conflict: {} [{}] {}",
                conflict.name, conflict.kind, conflict.description
            );
        }
        for tension in &self.story_soil.tensions {
            let _ = writeln!(out, "Tension: {tension}");
        }
        for hook in &self.story_soil.plot_hooks {
            let _ = writeln!(out, "Hook: {hook}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_world_json() {
        let world: WorldSetting = serde_json::from_str(
            r#"{
                "id": "w1",
                "name": "Ashfall",
                "type": "scifi",
                "geography": {"regions": [{"name": "Glass Wastes", "type": "desert"}]},
                "unknown_layer": {"ignored": true}
            }"#,
        )
        .unwrap();

        assert_eq!(world.world_type, WorldType::Scifi);
        assert_eq!(world.scale, WorldScale::City);
        assert_eq!(world.geography.regions[0].kind, "desert");
    }

    #[test]
    fn summary_mentions_layers() {
        let mut world = WorldSetting::new("w1", "Ashfall");
        world.philosophy.core_question = "Is memory a burden?".into();
        world.story_soil.plot_hooks.push("A courier loses a sealed letter".into());

        let summary = world.summary();
        assert!(summary.contains("Ashfall"));
        assert!(summary.contains("Is memory a burden?"));
        assert!(summary.contains("sealed letter"));
    }
}
