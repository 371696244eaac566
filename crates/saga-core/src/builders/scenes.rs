//! Chapter detail: scene sequence, scene instructions, character evolution

use super::schema::{
    CharacterEvolutionResponse, SceneDetailResponse, SceneSequenceItem, SceneSequenceResponse,
};
use super::{critical, enrich, prompts};
use crate::error::StepError;
use crate::model::{ChapterChange, ChapterSynopsis, CharacterId, SceneDetail, WritingGuidance};
use crate::state::EvolutionState;
use saga_generation::{PromptRole, RetryingCaller};
use serde_json::json;
use std::collections::BTreeMap;

/// Techniques applied to every scene of a detailed chapter
pub const WRITING_TECHNIQUES: [&str; 3] = ["show don't tell", "sensory detail", "pacing variation"];

/// Default narrative distance and tone
pub const MEDIUM: &str = "medium";

/// Chapter-level writing guidance for the world's style
#[must_use]
pub fn chapter_guidance(style: &str) -> WritingGuidance {
    WritingGuidance {
        techniques: WRITING_TECHNIQUES.iter().map(ToString::to_string).collect(),
        narrative_distance: MEDIUM.to_string(),
        style_hints: if style.trim().is_empty() {
            Vec::new()
        } else {
            vec![style.trim().to_string()]
        },
        tone: MEDIUM.to_string(),
    }
}

/// Design the scene sequence of `chapter`
///
/// # Errors
/// Fails when the sequence call is exhausted.
pub async fn design_scene_sequence(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    chapter: &ChapterSynopsis,
) -> Result<Vec<SceneSequenceItem>, StepError> {
    let prompt = prompts::scene_sequence(state, chapter);
    let response: SceneSequenceResponse = critical(
        caller,
        state,
        PromptRole::SceneSequenceDesigner,
        &prompt,
        format!("design scene sequence for chapter {}", chapter.chapter),
    )
    .await?;
    state.log_action(
        "scene_sequence",
        json!({ "chapter": chapter.chapter, "scenes": response.scenes.len() }),
    );
    Ok(response.scenes)
}

fn joined(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}

fn scene_from_response(item: &SceneSequenceItem, index: usize, r: SceneDetailResponse) -> SceneDetail {
    let pov = if r.pov_character.trim().is_empty() {
        r.characters.first().cloned().unwrap_or_default()
    } else {
        r.pov_character
    };

    let mut character_deltas = BTreeMap::new();
    let mut knowledge_gains = BTreeMap::new();
    let mut conflict_shifts = BTreeMap::new();
    for (id, change) in r.character_changes {
        let knowledge = change.new_knowledge.join(", ");
        let delta = joined(
            &[
                change.emotional_change.as_str(),
                change.internal_conflict.as_str(),
                knowledge.as_str(),
            ],
            "; ",
        );
        character_deltas.insert(id.clone(), delta);
        let gained: Vec<String> = change
            .new_knowledge
            .into_iter()
            .filter(|k| !k.trim().is_empty())
            .collect();
        if !gained.is_empty() {
            knowledge_gains.insert(id.clone(), gained);
        }
        if !change.internal_conflict.trim().is_empty() {
            conflict_shifts.insert(id, change.internal_conflict);
        }
    }

    let relationship_deltas = r
        .relationship_changes
        .into_iter()
        .map(|change| {
            let delta = match change.new_tension {
                Some(t) => format!("{} (tension {t})", change.change),
                None => change.change,
            };
            (change.relationship, delta)
        })
        .collect();

    let mut constraints: Vec<String> = r
        .constraints
        .must_include
        .into_iter()
        .map(|c| format!("include: {c}"))
        .collect();
    constraints.extend(
        r.constraints
            .must_not_reveal
            .into_iter()
            .map(|c| format!("do not reveal: {c}")),
    );
    if !r.constraints.transition_hint.trim().is_empty() {
        constraints.push(format!("transition: {}", r.constraints.transition_hint));
    }

    let senses = r.atmosphere.sensory_focus.join(", ");
    let senses = if senses.is_empty() {
        senses
    } else {
        format!("focus on {senses}")
    };
    let atmosphere = joined(
        &[r.atmosphere.mood.as_str(), r.atmosphere.pacing.as_str(), senses.as_str()],
        ", ",
    );

    SceneDetail {
        sequence: if item.sequence == 0 {
            u32::try_from(index + 1).unwrap_or(u32::MAX)
        } else {
            item.sequence
        },
        purpose: item.purpose.clone(),
        location: r.location,
        time: r.time,
        pov,
        characters: r.characters,
        main_action: r.main_action,
        dialogue_focus: r.dialogue_focus,
        character_deltas,
        knowledge_gains,
        conflict_shifts,
        relationship_deltas,
        foreshadow_plant: r.foreshadow_plant.into_iter().map(|f| f.foreshadow_id).collect(),
        foreshadow_payoff: r.foreshadow_payoff.into_iter().map(|f| f.foreshadow_id).collect(),
        constraints,
        atmosphere,
        guidance: WritingGuidance::default(),
    }
}

/// Write the detailed instruction for scene `index` of `chapter`
///
/// # Errors
/// Fails when the detail call is exhausted.
pub async fn detail_scene(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    chapter: &ChapterSynopsis,
    item: &SceneSequenceItem,
    index: usize,
) -> Result<SceneDetail, StepError> {
    let prompt = prompts::scene_detail(state, chapter, item, index);
    let response: SceneDetailResponse = critical(
        caller,
        state,
        PromptRole::SceneDetailDesigner,
        &prompt,
        format!("detail scene {} of chapter {}", index + 1, chapter.chapter),
    )
    .await?;
    let scene = scene_from_response(item, index, response);
    state.log_action(
        "scene_detailed",
        json!({
            "chapter": chapter.chapter,
            "sequence": scene.sequence,
            "location": scene.location,
            "pov": scene.pov,
        }),
    );
    Ok(scene)
}

/// Character ids appearing in `scenes`, in first-appearance order
#[must_use]
pub fn scene_cast(scenes: &[SceneDetail]) -> Vec<CharacterId> {
    let mut cast: Vec<CharacterId> = Vec::new();
    for id in scenes
        .iter()
        .flat_map(|s| std::iter::once(&s.pov).chain(s.characters.iter()))
    {
        if !id.is_empty() && !cast.contains(id) {
            cast.push(id.clone());
        }
    }
    cast
}

/// Derive chapter-level character evolution
///
/// Enrichment: on failure each character in the chapter keeps its current
/// emotion as the chapter's arc. Ids that name no character are dropped.
pub async fn track_character_evolution(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    chapter: u32,
    scenes: &[SceneDetail],
) -> BTreeMap<CharacterId, ChapterChange> {
    let prompt = prompts::character_evolution(state, chapter, scenes);
    let mut changes: BTreeMap<CharacterId, ChapterChange> = match enrich::<CharacterEvolutionResponse>(
        caller,
        state,
        PromptRole::CharacterEvolutionTracker,
        &prompt,
    )
    .await
    {
        Some(r) => r
            .evolutions
            .into_iter()
            .filter(|e| state.characters.contains_key(&e.character_id))
            .map(|e| {
                (
                    e.character_id,
                    ChapterChange {
                        emotional_arc: e.emotional_arc.join(" -> "),
                        growth_summary: e.growth_summary,
                        relationship_changes: e.relationship_changes,
                        turning_point: Some(e.turning_point).filter(|t| !t.trim().is_empty()),
                        ..ChapterChange::default()
                    },
                )
            })
            .collect(),
        None => scene_cast(scenes)
            .into_iter()
            .filter_map(|id| {
                let emotion = state.characters.get(&id)?.emotions.current_emotion.clone();
                Some((
                    id,
                    ChapterChange {
                        emotional_arc: emotion,
                        ..ChapterChange::default()
                    },
                ))
            })
            .collect(),
    };
    fold_scene_changes(&mut changes, scenes, state);
    state.log_action(
        "character_evolution",
        json!({ "chapter": chapter, "characters": changes.len() }),
    );
    changes
}

/// Merge per-scene knowledge and internal conflict shifts into chapter changes
///
/// A known character with scene notes but no chapter entry gets one, seeded
/// with its current emotion. Unknown ids are skipped.
pub fn fold_scene_changes(
    changes: &mut BTreeMap<CharacterId, ChapterChange>,
    scenes: &[SceneDetail],
    state: &EvolutionState,
) {
    for scene in scenes {
        for (id, gained) in &scene.knowledge_gains {
            if let Some(change) = chapter_entry(changes, state, id) {
                for k in gained {
                    if !change.new_knowledge.contains(k) {
                        change.new_knowledge.push(k.clone());
                    }
                }
            }
        }
        for (id, shift) in &scene.conflict_shifts {
            if let Some(change) = chapter_entry(changes, state, id) {
                change.internal_conflict.push(shift.clone());
            }
        }
    }
}

fn chapter_entry<'a>(
    changes: &'a mut BTreeMap<CharacterId, ChapterChange>,
    state: &EvolutionState,
    id: &CharacterId,
) -> Option<&'a mut ChapterChange> {
    let character = state.characters.get(id)?;
    Some(changes.entry(id.clone()).or_insert_with(|| ChapterChange {
        emotional_arc: character.emotions.current_emotion.clone(),
        ..ChapterChange::default()
    }))
}
