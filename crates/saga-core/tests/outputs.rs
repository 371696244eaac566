//! Chapter detail outlines, blueprint assembly and persistence over a
//! finished run.

use pretty_assertions::assert_eq;
use saga_core::blueprint::generated_scene_count;
use saga_core::builders::enrichment::{FALLBACK_MOTIFS, FALLBACK_SYMBOLS};
use saga_core::heuristics::estimate_chapter_metrics;
use saga_core::prelude::*;
use saga_core::state::CHAPTER_DETAIL_TAG;
use saga_core::{JsonFileStore, MemoryStore, PlanStatus, SceneOutput};
use saga_generation::PromptRole;
use saga_test_utils::{canned_port, fixture_world, scripted_orchestrator, ScriptedPort};
use serde_json::json;
use std::sync::Arc;

async fn finished(port: Arc<ScriptedPort>, chapters: u32) -> (EvolutionOrchestrator, EvolutionState) {
    let orchestrator = scripted_orchestrator(port);
    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(chapters))
        .await
        .expect("canned run must complete");
    (orchestrator, state)
}

/// Scenario: 3000 base words and five scenes estimate 5500 words.
#[test]
fn five_scenes_estimate_5500_words() {
    let metrics = estimate_chapter_metrics(3000, 500, 5);
    assert_eq!(metrics.word_count, 5500);
    assert_eq!(metrics.scene_count, 5);
}

#[tokio::test]
async fn chapter_detail_outline_is_complete() {
    let (orchestrator, mut state) = finished(Arc::new(canned_port(3, 4)), 4).await;

    let outline = orchestrator
        .generate_chapter_detail_outline(&mut state, 2)
        .await
        .expect("chapter 2 exists");

    assert_eq!(outline.chapter, 2);
    assert_eq!(outline.title, "Tide 2");
    assert_eq!(outline.scenes.len(), 3);
    assert_eq!(outline.metrics.word_count, 3000 + 3 * 500);
    assert!(outline.scenes.iter().all(|s| s.guidance == outline.guidance));
    assert_eq!(outline.guidance.tone, "medium");
    assert_eq!(outline.scenes[0].pov, "char_0");

    // plan: (1,3) (1,4) (2,4) (2,5) (3,5)
    assert_eq!(outline.foreshadow_tracking.planted, vec!["foreshadow_2", "foreshadow_3"]);
    assert!(outline.foreshadow_tracking.paid_off.is_empty());
    assert_eq!(outline.foreshadow_tracking.active, vec!["foreshadow_0", "foreshadow_1"]);

    assert_eq!(state.chapter_outlines.get(&2), Some(&outline));
    assert_eq!(outline.purpose, state.chapter_plan.as_ref().unwrap().chapters[1].purpose);
    assert_eq!(outline.key_events, state.chapter_plan.as_ref().unwrap().chapters[1].key_events);

    let tracker = &state.character_evolution["char_0"];
    assert_eq!(tracker.chapter_changes[&2].emotional_arc, "anger -> doubt");
    // three scenes, each teaching the same fact and shifting the same conflict
    assert_eq!(tracker.knowledge_growth, vec!["chapter 2: the charter is forged"]);
    assert_eq!(tracker.internal_conflict_progress.len(), 3);
    assert_eq!(tracker.turning_points, vec!["chapter 2: refuses the guild's order"]);
    assert_eq!(tracker.relationship_history["char_1"], vec!["chapter 2: open hostility"]);
    assert!(state.characters["char_0"].arc_progress > 0.0);

    // one of four chapters tracked
    let blueprint = orchestrator
        .create_blueprint(&mut state, None)
        .await
        .expect("blueprint after detail");
    assert_eq!(blueprint.character_arcs["char_0"].current_progress, 25);
    assert!(state.action_log.iter().any(|e| e.phase == CHAPTER_DETAIL_TAG));
    assert_eq!(state.phase(), Phase::Done);
}

/// Regeneration replaces the cached outline rather than adding another.
#[tokio::test]
async fn regenerating_a_chapter_overwrites_it() {
    let port = Arc::new(canned_port(3, 4));
    let (orchestrator, mut state) = finished(port.clone(), 4).await;

    orchestrator
        .generate_chapter_detail_outline(&mut state, 1)
        .await
        .expect("first pass");
    port.push_text(
        PromptRole::SceneSequenceDesigner,
        saga_test_utils::scene_sequence(5).to_string(),
    );
    let second = orchestrator
        .generate_chapter_detail_outline(&mut state, 1)
        .await
        .expect("second pass");

    assert_eq!(second.scenes.len(), 5);
    assert_eq!(state.chapter_outlines.len(), 1);
    assert_eq!(state.chapter_outlines[&1].scenes.len(), 5);
    assert_eq!(state.character_evolution["char_0"].chapter_changes.len(), 1);
}

/// Regenerating a chapter rebuilds tracker history for that chapter only and
/// drops characters that no longer change in it.
#[tokio::test]
async fn regeneration_does_not_duplicate_tracker_history() {
    let port = Arc::new(canned_port(3, 4));
    let (orchestrator, mut state) = finished(port.clone(), 4).await;

    let both = json!({
        "evolutions": [
            {
                "character_id": "char_0",
                "emotional_arc": ["anger"],
                "relationship_changes": {"char_1": "trust breaks"}
            },
            {
                "character_id": "char_1",
                "emotional_arc": ["fear"],
                "relationship_changes": {"char_0": "trust breaks"}
            }
        ]
    });
    let only_first = json!({
        "evolutions": [{
            "character_id": "char_0",
            "emotional_arc": ["anger"],
            "relationship_changes": {"char_1": "trust breaks"}
        }]
    });
    port.push_text(PromptRole::CharacterEvolutionTracker, both.to_string());
    orchestrator
        .generate_chapter_detail_outline(&mut state, 1)
        .await
        .expect("first pass");
    assert!(state.character_evolution["char_1"].chapter_changes.contains_key(&1));

    port.push_text(PromptRole::CharacterEvolutionTracker, only_first.to_string());
    orchestrator
        .generate_chapter_detail_outline(&mut state, 1)
        .await
        .expect("second pass");

    let first = &state.character_evolution["char_0"];
    assert_eq!(first.relationship_history["char_1"], vec!["chapter 1: trust breaks"]);
    assert_eq!(first.emotional_journey, vec!["anger"]);
    let second = &state.character_evolution["char_1"];
    assert!(!second.chapter_changes.contains_key(&1));
    assert!(second.relationship_history.is_empty());
}

#[tokio::test]
async fn unknown_chapter_is_rejected() {
    let (orchestrator, mut state) = finished(Arc::new(canned_port(2, 3)), 3).await;
    let err = orchestrator
        .generate_chapter_detail_outline(&mut state, 99)
        .await
        .expect_err("chapter 99 is not planned");
    assert!(matches!(err, EvolutionError::ChapterNotFound(99)));
}

#[tokio::test]
async fn detail_requires_finished_run() {
    let orchestrator = scripted_orchestrator(Arc::new(canned_port(2, 3)));
    let mut state = EvolutionState::new(Arc::new(fixture_world()), 500);
    let err = orchestrator
        .generate_chapter_detail_outline(&mut state, 1)
        .await
        .expect_err("nothing planned yet");
    assert!(matches!(
        err,
        EvolutionError::NotReady {
            required: Phase::Done,
            actual: Phase::Init
        }
    ));
}

/// A failed scene detail surfaces as a chapter error and leaves the run done.
#[tokio::test]
async fn failed_scene_detail_names_the_chapter() {
    let port = Arc::new(canned_port(2, 3));
    let (orchestrator, mut state) = finished(port.clone(), 3).await;
    port.fail_always(PromptRole::SceneDetailDesigner);

    let err = orchestrator
        .generate_chapter_detail_outline(&mut state, 3)
        .await
        .expect_err("scene detail cannot succeed");

    assert!(matches!(err, EvolutionError::ChapterDetail { chapter: 3, .. }));
    assert_eq!(state.phase(), Phase::Done);
    assert!(state.chapter_outlines.is_empty());
}

#[tokio::test]
async fn blueprint_covers_every_chapter() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = scripted_orchestrator(Arc::new(canned_port(3, 4))).with_store(store.clone());
    let mut state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(4))
        .await
        .expect("canned run must complete");
    orchestrator
        .generate_chapter_detail_outline(&mut state, 2)
        .await
        .expect("chapter 2 exists");

    let blueprint = orchestrator
        .create_blueprint(&mut state, None)
        .await
        .expect("blueprint assembles");

    assert!(blueprint.id.starts_with("narrative_"));
    assert_eq!(blueprint.world_id, "world_saltmarsh");
    assert_eq!(blueprint.evolution_id, state.id);
    let chapters: Vec<u32> = blueprint.chapter_plans.iter().map(|c| c.chapter).collect();
    assert_eq!(chapters, vec![1, 2, 3, 4]);
    assert!(blueprint.chapter_plans.iter().all(|c| c.status == PlanStatus::Pending));
    assert_eq!(blueprint.chapter_plans[1].word_count, 4500);

    assert_eq!(blueprint.scenes_for(1).count(), generated_scene_count(3));
    assert_eq!(blueprint.scenes_for(2).count(), 3);
    let sequences: Vec<u32> = blueprint.scenes.iter().map(|s| s.sequence).collect();
    let expected: Vec<u32> = (1..=u32::try_from(blueprint.scenes.len()).unwrap()).collect();
    assert_eq!(sequences, expected);

    assert_eq!(blueprint.character_arcs.len(), 3);
    assert_eq!(blueprint.theme_plan.core_theme, "what is owed");
    assert_eq!(blueprint.theme_plan.symbols[0].name, "the bell");

    let stored = store.get_blueprint(&blueprint.id).await.expect("blueprint saved");
    assert_eq!(stored, blueprint);
}

/// With every enrichment role down the blueprint still assembles from fallbacks.
#[tokio::test]
async fn blueprint_falls_back_when_enrichment_is_down() {
    let port = Arc::new(canned_port(2, 3));
    let (orchestrator, mut state) = finished(port.clone(), 3).await;
    for role in [
        PromptRole::StructureDesigner,
        PromptRole::ThemeDesigner,
        PromptRole::SceneDesigner,
        PromptRole::ArcDesigner,
    ] {
        port.fail_always(role);
    }

    let blueprint = orchestrator
        .create_blueprint(&mut state, Some(5))
        .await
        .expect("fallbacks keep assembly alive");

    assert_eq!(blueprint.chapter_plans.len(), 5);
    assert_eq!(blueprint.chapter_plans[4].title, "Chapter 5");
    let symbols: Vec<&str> = blueprint.theme_plan.symbols.iter().map(|s| s.name.as_str()).collect();
    let fallback: Vec<&str> = FALLBACK_SYMBOLS.iter().map(|(n, _)| *n).collect();
    assert_eq!(symbols, fallback);
    assert_eq!(blueprint.theme_plan.motifs.len(), FALLBACK_MOTIFS.len());
}

#[tokio::test]
async fn file_store_keeps_run_outputs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let orchestrator = scripted_orchestrator(Arc::new(canned_port(2, 3))).with_store(store.clone());
    let world = Arc::new(fixture_world());
    store.save_world(&world).await.expect("world saved");

    let mut state = orchestrator
        .execute_full_evolution(world.clone(), Some(3))
        .await
        .expect("canned run must complete");
    let blueprint = orchestrator
        .create_blueprint(&mut state, None)
        .await
        .expect("blueprint assembles");

    let checkpoint = store.get_checkpoint(&state.id).await.expect("checkpoint written");
    assert_eq!(checkpoint.phase(), Phase::Done);
    assert_eq!(checkpoint.characters.len(), 2);
    assert_eq!(store.get_world("world_saltmarsh").await.expect("world").name, "Saltmarsh");
    assert_eq!(
        store.get_blueprint(&blueprint.id).await.expect("blueprint").chapter_plans.len(),
        3
    );

    let scene = SceneOutput::new(&blueprint.id, 1, 1, "The bell rang twice.");
    store.save_scene(&scene).await.expect("scene saved");
    assert_eq!(store.list_scenes(&blueprint.id).await.expect("listed"), vec![scene]);
}
