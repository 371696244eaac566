//! Enrichment calls and their fallback catalogues
//!
//! Everything here is cosmetic. A failed call is logged and replaced by a
//! fixed value, rotated deterministically where a catalogue has several.

use super::schema::{MotifsResponse, SymbolsResponse};
use super::{enrich, enrich_text, prompts};
use crate::heuristics::{conflict_for_chapter, has_high_tension};
use crate::labels::ConflictType;
use crate::model::ConflictThread;
use crate::state::EvolutionState;
use crate::world::WorldSetting;
use saga_generation::{PromptRole, RetryingCaller};

/// Scene purposes, indexed by scene position
pub const SCENE_PURPOSES: [&str; 6] = [
    "opening: establish the atmosphere",
    "development: advance the plot",
    "conflict: bring the opposition into the open",
    "turn: an unexpected change",
    "climax: emotional release",
    "wrap-up: leave a hook",
];

/// Scene action when generation fails
pub const SCENE_ACTION_FALLBACK: &str = "show character interaction, advance the plot";

/// Dialogue focuses, indexed by `(chapter + scene) % 8`
pub const DIALOGUE_FOCUSES: [&str; 8] = [
    "explore the conflict's core question",
    "reveal inner struggle",
    "clash of positions",
    "convey key information",
    "deepen relationships",
    "hint at the future",
    "recall the past",
    "express emotional change",
];

/// Scene moods, indexed by `(chapter + scene) % 8`
pub const MOODS: [&str; 8] = [
    "calm",
    "tense",
    "suspenseful",
    "warm",
    "oppressive",
    "impassioned",
    "eerie",
    "solemn",
];

/// Mood forced while an unresolved conflict runs hot
pub const TENSE_MOOD: &str = MOODS[1];

/// Location when the world has no regions
pub const DEFAULT_LOCATION: &str = "default location";

/// Expected words per blueprint scene
pub const EXPECTED_SCENE_LENGTH: u32 = 800;

/// Turning-point change when generation fails
pub const CHANGE_FALLBACK: &str = "the character is forced to reconsider what they want";

/// Symbols used when generation fails
pub const FALLBACK_SYMBOLS: [(&str, &str); 3] = [
    ("a locked door", "what the protagonist refuses to face"),
    ("a guttering lamp", "hope that survives against the odds"),
    ("a broken mirror", "a self-image that has to be rebuilt"),
];

/// Motifs used when generation fails
pub const FALLBACK_MOTIFS: [&str; 3] = [
    "repeated choices between safety and truth",
    "journeys that return to where they began",
    "promises made and broken",
];

/// Prose beats of the story outline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryBeat {
    /// Middle turn of act two
    Midpoint,
    /// Lowest point
    AllIsLost,
    /// Turn into act three
    PlotPointTwo,
    /// Final confrontation
    Climax,
    /// Aftermath
    Resolution,
}

impl StoryBeat {
    /// Beat name used in prompts
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Midpoint => "midpoint",
            Self::AllIsLost => "all-is-lost moment",
            Self::PlotPointTwo => "second plot point",
            Self::Climax => "climax",
            Self::Resolution => "resolution",
        }
    }

    /// Fixed text used when generation fails
    #[must_use]
    pub fn fallback(self) -> &'static str {
        match self {
            Self::Midpoint => {
                "midpoint: the protagonist gains new understanding of the conflict; the situation fundamentally changes"
            }
            Self::AllIsLost => "the conflict peaks and the protagonist faces the hardest test",
            Self::PlotPointTwo => {
                "the protagonist regroups, gathers every resource and prepares for the final confrontation"
            }
            Self::Climax => {
                "climax: every thread converges and the conflict erupts in a final confrontation"
            }
            Self::Resolution => {
                "the conflict is resolved, the protagonist has grown, the world finds a new balance"
            }
        }
    }
}

/// Fallback purpose for scene `scene_index`
#[inline]
#[must_use]
pub fn fallback_scene_purpose(scene_index: usize) -> &'static str {
    SCENE_PURPOSES[scene_index % SCENE_PURPOSES.len()]
}

/// Dialogue focus for a blueprint scene
///
/// The chapter's conflict decides first: internal conflicts focus on inner
/// struggle, interpersonal ones on clashing positions. Otherwise the focus
/// rotates.
#[must_use]
pub fn dialogue_focus(conflicts: &[ConflictThread], chapter: u32, scene_index: usize) -> &'static str {
    match conflict_for_chapter(conflicts, chapter).map(|c| c.conflict_type) {
        Some(ConflictType::Internal) => DIALOGUE_FOCUSES[1],
        Some(ConflictType::Interpersonal) => DIALOGUE_FOCUSES[2],
        _ => DIALOGUE_FOCUSES[(chapter as usize + scene_index) % DIALOGUE_FOCUSES.len()],
    }
}

/// Mood for a blueprint scene
#[must_use]
pub fn scene_mood(conflicts: &[ConflictThread], threshold: u8, chapter: u32, scene_index: usize) -> &'static str {
    if has_high_tension(conflicts, threshold) {
        TENSE_MOOD
    } else {
        MOODS[(chapter as usize + scene_index) % MOODS.len()]
    }
}

/// Location rotated over the world's regions
#[must_use]
pub fn scene_location(world: &WorldSetting, chapter: u32, scene_index: usize) -> String {
    let regions = &world.geography.regions;
    if regions.is_empty() {
        return DEFAULT_LOCATION.to_string();
    }
    let region = &regions[(chapter as usize + scene_index) % regions.len()];
    format!("{}({})", region.name, region.kind)
}

/// Prose for one outline beat of `conflict`
pub async fn story_beat(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    beat: StoryBeat,
    conflict: &ConflictThread,
) -> String {
    let prompt = prompts::story_beat(beat.label(), conflict);
    enrich_text(caller, state, PromptRole::StructureDesigner, &prompt, beat.fallback()).await
}

/// Purpose prose for a blueprint scene
pub async fn scene_purpose(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    chapter: u32,
    scene_index: usize,
) -> String {
    let prompt = prompts::scene_purpose(state, chapter, scene_index);
    enrich_text(
        caller,
        state,
        PromptRole::SceneDesigner,
        &prompt,
        fallback_scene_purpose(scene_index),
    )
    .await
}

/// Action prose for a blueprint scene
pub async fn scene_action(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    chapter: u32,
    scene_index: usize,
    purpose: &str,
) -> String {
    let prompt = prompts::scene_action(state, chapter, scene_index, purpose);
    enrich_text(caller, state, PromptRole::SceneDesigner, &prompt, SCENE_ACTION_FALLBACK).await
}

/// How a character changes at a turning point
pub async fn character_change(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    character_id: &str,
    event: &str,
) -> String {
    let prompt = match state.characters.get(character_id) {
        Some(c) => prompts::character_change(
            &c.name,
            &c.emotions.current_emotion,
            &c.desires.conscious_want,
            event,
        ),
        None => return CHANGE_FALLBACK.to_string(),
    };
    enrich_text(caller, state, PromptRole::ArcDesigner, &prompt, CHANGE_FALLBACK).await
}

/// Symbols for the theme plan as `(name, meaning)` pairs
pub async fn symbols(caller: &RetryingCaller, state: &mut EvolutionState, theme: &str) -> Vec<(String, String)> {
    let prompt = {
        let names: Vec<&str> = state.character_names().into_iter().take(3).collect();
        prompts::symbols(theme, &names)
    };
    match enrich::<SymbolsResponse>(caller, state, PromptRole::ThemeDesigner, &prompt).await {
        Some(r) => r.symbols.into_iter().map(|s| (s.name, s.meaning)).collect(),
        None => FALLBACK_SYMBOLS
            .iter()
            .map(|(n, m)| ((*n).to_string(), (*m).to_string()))
            .collect(),
    }
}

/// Motifs for the theme plan
pub async fn motifs(caller: &RetryingCaller, state: &mut EvolutionState, theme: &str) -> Vec<String> {
    let prompt = {
        let names: Vec<&str> = state.character_names().into_iter().take(3).collect();
        prompts::motifs(theme, &names)
    };
    match enrich::<MotifsResponse>(caller, state, PromptRole::ThemeDesigner, &prompt).await {
        Some(r) => r.motifs,
        None => FALLBACK_MOTIFS.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Region;

    fn conflict(kind: ConflictType, intensity: u8) -> ConflictThread {
        ConflictThread {
            id: "conflict_0".into(),
            conflict_type: kind,
            core_question: String::new(),
            participants: Vec::new(),
            stakes: String::new(),
            evolution_path: Vec::new(),
            resolved: false,
            intensity,
        }
    }

    #[test]
    fn mood_rotates_until_tension_runs_hot() {
        let calm = [conflict(ConflictType::Societal, 5)];
        assert_eq!(scene_mood(&calm, 8, 1, 0), MOODS[1]);
        assert_eq!(scene_mood(&calm, 8, 2, 1), MOODS[3]);
        assert_eq!(scene_mood(&calm, 8, 7, 1), MOODS[0]);

        let hot = [conflict(ConflictType::Societal, 9)];
        assert_eq!(scene_mood(&hot, 8, 2, 1), TENSE_MOOD);
    }

    #[test]
    fn dialogue_focus_follows_conflict_type() {
        assert_eq!(dialogue_focus(&[conflict(ConflictType::Internal, 5)], 3, 0), DIALOGUE_FOCUSES[1]);
        assert_eq!(
            dialogue_focus(&[conflict(ConflictType::Interpersonal, 5)], 3, 0),
            DIALOGUE_FOCUSES[2]
        );
        assert_eq!(dialogue_focus(&[conflict(ConflictType::Nature, 5)], 3, 2), DIALOGUE_FOCUSES[5]);
        assert_eq!(dialogue_focus(&[], 4, 4), DIALOGUE_FOCUSES[0]);
    }

    #[test]
    fn location_rotates_over_regions() {
        let mut world = WorldSetting::new("w", "World");
        assert_eq!(scene_location(&world, 1, 0), DEFAULT_LOCATION);

        world.geography.regions = vec![
            Region {
                id: "r0".into(),
                name: "Saltmarsh".into(),
                kind: "wetland".into(),
                description: String::new(),
            },
            Region {
                id: "r1".into(),
                name: "Kestrel Keep".into(),
                kind: "fortress".into(),
                description: String::new(),
            },
        ];
        assert_eq!(scene_location(&world, 1, 0), "Kestrel Keep(fortress)");
        assert_eq!(scene_location(&world, 1, 1), "Saltmarsh(wetland)");
    }

    #[test]
    fn purpose_catalogue_wraps() {
        assert_eq!(fallback_scene_purpose(0), SCENE_PURPOSES[0]);
        assert_eq!(fallback_scene_purpose(7), SCENE_PURPOSES[1]);
    }
}
