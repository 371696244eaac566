//! Prompt payloads
//!
//! Prompts are opaque request text. They carry the context each call needs:
//! the world summary, the architecture, and whatever entities exist so far.

use crate::model::{ChapterSynopsis, ConflictThread, ForeshadowPlan, KeyEvent, SceneDetail};
use crate::state::EvolutionState;
use crate::builders::schema::{SceneSequenceItem, WorldAnalysisResponse};
use std::fmt::Write as _;

fn architecture_block(state: &EvolutionState) -> String {
    state.architecture.as_ref().map_or_else(String::new, |a| {
        format!(
            "Narrative mode: {}\nCore conflict direction: {}\nThematic core: {}\n",
            a.narrative_mode, a.core_conflict_type, a.thematic_core
        )
    })
}

fn characters_block(state: &EvolutionState) -> String {
    let mut out = String::new();
    for c in state.characters.values() {
        let _ = writeln!(
            out,
            "- {} ({}, {}): wants {}; needs {}",
            c.id, c.name, c.role, c.desires.conscious_want, c.desires.unconscious_need
        );
    }
    if out.is_empty() {
        out.push_str("(none yet)\n");
    }
    out
}

fn conflicts_block(conflicts: &[ConflictThread]) -> String {
    let mut out = String::new();
    for c in conflicts {
        let _ = writeln!(
            out,
            "- {} [{}] intensity {}: {} (participants: {})",
            c.id,
            c.conflict_type,
            c.intensity,
            c.core_question,
            c.participants.join(", ")
        );
    }
    out
}

fn foreshadow_block(plan: &[ForeshadowPlan]) -> String {
    let mut out = String::new();
    for f in plan {
        let _ = writeln!(
            out,
            "- {}: {} (plant ch{} s{}, payoff ch{} s{})",
            f.id, f.content, f.plant_chapter, f.plant_scene, f.payoff_chapter, f.payoff_scene
        );
    }
    out
}

fn events_block(events: &[KeyEvent]) -> String {
    let mut out = String::new();
    for e in events {
        let _ = writeln!(out, "- {} #{} {}: {}", e.id, e.sequence, e.name, e.description);
    }
    out
}

pub(crate) fn world_analysis(state: &EvolutionState) -> String {
    format!(
        "Analyse this world as the ground for a novel. Identify its core tensions, \
         its story potential, its complexity, and the narrative modes it suits.\n\n{}",
        state.world.summary()
    )
}

pub(crate) fn mode_selection(state: &EvolutionState, analysis: &WorldAnalysisResponse) -> String {
    format!(
        "{}\nCore tensions: {}\nSuggested modes: {}\n\nSelect exactly one narrative mode from: \
         ensemble drama, personal growth, hero's journey, struggle against abstract forces, \
         mystery, relationship drama. Explain the choice.",
        state.world.summary(),
        analysis.core_tensions.join("; "),
        analysis.suggested_modes.join("; ")
    )
}

pub(crate) fn roster_planning(state: &EvolutionState, mode: &str) -> String {
    format!(
        "{}\nNarrative mode: {mode}\n\nPlan the character roster: how many characters in total, \
         how many protagonists, antagonists and supporting characters, and the shape of their \
         relationship network (star, mesh, chain or clusters).",
        state.world.summary()
    )
}

pub(crate) fn conflict_direction(state: &EvolutionState, mode: &str, total_characters: u32) -> String {
    format!(
        "{}\nNarrative mode: {mode}\nCharacters planned: {total_characters}\n\nIdentify the \
         primary and secondary conflicts this world can sustain, the thematic core, and one \
         overall conflict direction.",
        state.world.summary()
    )
}

pub(crate) fn conflict_deepening(direction: &str, thematic_core: &str) -> String {
    format!(
        "First-pass conflict direction: {direction}\nThematic core: {thematic_core}\n\n\
         Refine the direction into one sharper sentence and list the layers of conflict it contains."
    )
}

pub(crate) fn character_creation(state: &EvolutionState, index: usize, total: u32) -> String {
    format!(
        "{}{}\nExisting characters:\n{}\nCreate character {} of {total}. Give a name, a role \
         (protagonist, antagonist, mentor, foil or supporting), age, background, personality, \
         conscious want, unconscious need, core traits and flaws. Make them distinct from the \
         existing characters.",
        state.world.summary(),
        architecture_block(state),
        characters_block(state),
        index + 1
    )
}

pub(crate) fn character_deepening(state: &EvolutionState, id: &str) -> String {
    let summary = state.characters.get(id).map_or_else(String::new, |c| {
        format!(
            "Name: {}\nRole: {}\nBackground: {}\nWants: {}\nNeeds: {}\n",
            c.name, c.role, c.background, c.desires.conscious_want, c.desires.unconscious_need
        )
    });
    format!(
        "{summary}\nDeepen this character's psychology: internal conflicts, secrets, fears, \
         emotional triggers, masking behaviours, and the gap between want and need."
    )
}

pub(crate) fn relationship_network(state: &EvolutionState) -> String {
    format!(
        "{}Characters:\n{}\nDesign the relationships between these characters. Use the ids \
         exactly as given for char_a and char_b. For each pair that matters give the relation \
         type, tension (0-10), power dynamic, shared history and unspoken tension.",
        architecture_block(state),
        characters_block(state)
    )
}

pub(crate) fn relationship_evolution(state: &EvolutionState) -> String {
    let mut edges = String::new();
    for (key, edge) in &state.relationship_network.edges {
        let _ = writeln!(edges, "- {key}: {} (tension {})", edge.relation_type, edge.tension);
    }
    format!(
        "Relationships:\n{edges}\nProject how each relationship evolves over the story: its \
         initial state, the steps of change, its final state and the turning point."
    )
}

pub(crate) fn foreshadow_planning(state: &EvolutionState) -> String {
    format!(
        "{}{}Characters:\n{}\nPlan a network of 5 to 10 foreshadowing hints. For each give an \
         id, type, content, plant chapter and scene, payoff chapter and scene (payoff after \
         plant), and importance.",
        state.world.summary(),
        architecture_block(state),
        characters_block(state)
    )
}

pub(crate) fn foreshadow_validation(plan: &[ForeshadowPlan]) -> String {
    format!(
        "Foreshadow plan:\n{}\nCheck this plan for completeness: every hint must be paid off \
         after it is planted. Report issues, suggestions and ids with missing payoffs.",
        foreshadow_block(plan)
    )
}

pub(crate) fn conflict_design(state: &EvolutionState, index: usize, total: usize) -> String {
    format!(
        "{}Characters:\n{}\nExisting conflicts:\n{}\nDesign conflict {} of {total}. Give its \
         type (internal, interpersonal, societal, nature, supernatural or technology), core \
         question, participant character ids, stakes and current intensity (0-10). Avoid \
         repeating existing conflicts.",
        architecture_block(state),
        characters_block(state),
        conflicts_block(&state.conflicts),
        index + 1
    )
}

pub(crate) fn conflict_evolution(conflict: &ConflictThread) -> String {
    format!(
        "Conflict: {} [{}]\nCore question: {}\nStakes: {}\n\nDesign the evolution path of this \
         conflict as ordered stages, each with a description, concrete events and intensity (0-10).",
        conflict.id, conflict.conflict_type, conflict.core_question, conflict.stakes
    )
}

pub(crate) fn conflict_hierarchy(state: &EvolutionState) -> String {
    format!(
        "Conflicts:\n{}\nClassify these conflicts into primary, secondary and tertiary tiers by \
         id, and describe how the tiers interact.",
        conflicts_block(&state.conflicts)
    )
}

pub(crate) fn story_direction(state: &EvolutionState) -> String {
    format!(
        "{}{}Characters:\n{}Conflicts:\n{}\nPlan the story's opening situation and its overall \
         direction, and name its themes.",
        state.world.summary(),
        architecture_block(state),
        characters_block(state),
        conflicts_block(&state.conflicts)
    )
}

pub(crate) fn key_events(state: &EvolutionState, opening: &str, direction: &str) -> String {
    format!(
        "Opening: {opening}\nDirection: {direction}\nCharacters:\n{}Conflicts:\n{}Foreshadowing:\n{}\n\
         Design the ordered key events of the story. For each give an id, name, description, \
         involved character ids and consequences.",
        characters_block(state),
        conflicts_block(&state.conflicts),
        foreshadow_block(&state.foreshadow_plan)
    )
}

pub(crate) fn climax(events: &[KeyEvent]) -> String {
    format!(
        "Key events:\n{}\nDesign the climax that these events build to, and the resolution.",
        events_block(events)
    )
}

pub(crate) fn chapter_assignment(state: &EvolutionState, chapter_count: u32) -> String {
    let events = state
        .global_outline
        .as_ref()
        .map(|o| events_block(&o.key_events))
        .unwrap_or_default();
    format!(
        "Key events:\n{events}Foreshadowing:\n{}\nDistribute the key events over {chapter_count} \
         chapters numbered from 1. For each chapter give its number, title, summary, purpose, \
         the key event ids it contains, and an ending hook.",
        foreshadow_block(&state.foreshadow_plan)
    )
}

pub(crate) fn chapter_refinement(chapters: &[ChapterSynopsis]) -> String {
    let mut out = String::new();
    for c in chapters {
        let _ = writeln!(out, "- chapter {}: {} - {}", c.chapter, c.title, c.purpose);
    }
    format!(
        "Chapter sequence:\n{out}\nImprove the transitions between these chapters. Give \
         transition notes, pacing notes and improvements."
    )
}

pub(crate) fn scene_sequence(state: &EvolutionState, chapter: &ChapterSynopsis) -> String {
    format!(
        "Chapter {}: {}\nSummary: {}\nPurpose: {}\nKey events: {}\nCharacters:\n{}\nDesign the \
         sequence of scenes for this chapter. For each give its sequence number, type and purpose.",
        chapter.chapter,
        chapter.title,
        chapter.summary,
        chapter.purpose,
        chapter.key_events.join(", "),
        characters_block(state)
    )
}

pub(crate) fn scene_detail(
    state: &EvolutionState,
    chapter: &ChapterSynopsis,
    scene: &SceneSequenceItem,
    index: usize,
) -> String {
    let regions: Vec<&str> = state
        .world
        .geography
        .regions
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    format!(
        "Chapter {}: {}\nScene {} ({}): {}\nRegions: {}\nCharacters:\n{}Foreshadowing:\n{}\n\
         Write a detailed instruction for this scene: location, time, point-of-view character \
         id, character ids present, main action, dialogue focus, character changes keyed by id, \
         relationship changes, foreshadow ids planted and paid off, constraints and atmosphere.",
        chapter.chapter,
        chapter.title,
        index + 1,
        scene.kind,
        scene.purpose,
        regions.join(", "),
        characters_block(state),
        foreshadow_block(&state.foreshadow_plan)
    )
}

pub(crate) fn character_evolution(state: &EvolutionState, chapter: u32, scenes: &[SceneDetail]) -> String {
    let mut out = String::new();
    for s in scenes {
        let _ = writeln!(out, "- scene {} at {}: {}", s.sequence, s.location, s.main_action);
    }
    format!(
        "Characters:\n{}Scenes of chapter {chapter}:\n{out}\nFor each character who appears, \
         describe their emotional arc across the chapter, a growth summary and relationship \
         changes keyed by the other character's id.",
        characters_block(state)
    )
}

pub(crate) fn story_beat(beat: &str, conflict: &ConflictThread) -> String {
    format!(
        "Conflict type: {}\nCore question: {}\nIntensity: {}\n\nDescribe the story's {beat} in \
         80 to 150 words: what concretely happens, how the protagonist's understanding changes, \
         and how the direction of the story shifts. Output only the description.",
        conflict.conflict_type, conflict.core_question, conflict.intensity
    )
}

pub(crate) fn scene_purpose(state: &EvolutionState, chapter: u32, scene: usize) -> String {
    let conflict = state
        .conflicts
        .first()
        .map(|c| format!("{} ({})", c.conflict_type, c.core_question))
        .unwrap_or_default();
    format!(
        "Core conflict: {conflict}\nMain characters: {}\n\nIn one or two sentences, state the \
         purpose of scene {} in chapter {chapter}. Output only the purpose.",
        state.character_names().into_iter().take(3).collect::<Vec<_>>().join(", "),
        scene + 1
    )
}

pub(crate) fn scene_action(state: &EvolutionState, chapter: u32, scene: usize, purpose: &str) -> String {
    format!(
        "Scene purpose: {purpose}\nCharacters present: {}\n\nDescribe in 80 to 150 words what \
         happens in scene {} of chapter {chapter}: the concrete action, the emotional shift and \
         how it moves the plot. Output only the description.",
        state.character_names().into_iter().take(2).collect::<Vec<_>>().join(", "),
        scene + 1
    )
}

pub(crate) fn character_change(name: &str, emotion: &str, want: &str, event: &str) -> String {
    format!(
        "Character: {name}\nCurrent emotion: {emotion}\nWants: {want}\nTurning point: {event}\n\n\
         In one or two sentences, describe how this character changes at this turning point. \
         Output only the description."
    )
}

pub(crate) fn symbols(theme: &str, names: &[&str]) -> String {
    format!(
        "Core theme: {theme}\nMain characters: {}\n\nDesign 3 to 5 symbols: concrete objects, \
         places or elements that recur and carry the theme. Give each a name and meaning.",
        names.join(", ")
    )
}

pub(crate) fn motifs(theme: &str, names: &[&str]) -> String {
    format!(
        "Core theme: {theme}\nMain characters: {}\n\nDesign 3 to 5 motifs: recurring patterns, \
         situations or ideas that explore the theme. Give each as one sentence.",
        names.join(", ")
    )
}
