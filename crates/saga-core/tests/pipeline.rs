//! End-to-end runs of the six-phase pipeline over a scripted port.
//!
//! These tests pin the observable contract of a run:
//! - phases execute in order and a finished run is at `Done`
//! - a critical failure aborts the run, names the phase and leaves the state
//!   in `Failed`
//! - enrichment failures never abort a run
//! - every generation attempt is one round and one audit entry

use saga_core::prelude::*;
use saga_core::{MemoryStore, StoryLength};
use saga_generation::PromptRole;
use saga_test_utils::{canned_port, fixture_world, scripted_orchestrator, scripted_orchestrator_with};
use std::sync::Arc;

fn attempts_for(state: &EvolutionState, role: PromptRole) -> usize {
    let prefix = format!("{role} attempt ");
    state
        .action_log
        .iter()
        .filter(|e| e.description.starts_with(&prefix))
        .count()
}

/// Scenario: a roster of three yields exactly three characters and at most
/// three relationship edges.
#[tokio::test]
async fn roster_of_three_yields_three_characters() {
    let port = Arc::new(canned_port(3, 4));
    let orchestrator = scripted_orchestrator(port.clone());

    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(4))
        .await
        .expect("canned run must complete");

    assert_eq!(state.phase(), Phase::Done);
    assert_eq!(state.characters.len(), 3);
    assert!(state.relationship_network.edges.len() <= 3);
    assert_eq!(state.relationship_network.nodes.len(), 3);
    assert_eq!(state.relationship_network.network_type, "star");
    assert_eq!(state.relationship_network.center_node.as_deref(), Some("char_0"));
    assert_eq!(state.character_evolution.len(), 3);
    assert_eq!(state.conflicts.len(), 5);
    assert_eq!(state.chapter_plan.as_ref().map(|p| p.chapters.len()), Some(4));
    assert!(state.global_outline.is_some());
}

/// Each phase logs a start and a completion, in pipeline order.
#[tokio::test]
async fn phases_are_logged_in_order() {
    let port = Arc::new(canned_port(2, 3));
    let orchestrator = scripted_orchestrator(port);

    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(3))
        .await
        .expect("canned run must complete");

    let started: Vec<String> = state
        .action_log
        .iter()
        .filter(|e| e.description == "phase_started")
        .map(|e| e.phase.clone())
        .collect();
    let expected: Vec<String> = Phase::PIPELINE.iter().map(|p| p.to_string()).collect();
    assert_eq!(started, expected);

    let completed = state
        .action_log
        .iter()
        .filter(|e| e.description == "phase_completed")
        .count();
    assert_eq!(completed, 6);
    assert_eq!(state.action_log.last().map(|e| e.description.as_str()), Some("evolution_completed"));
}

/// Every port call is one round; the counter matches the audit entries.
#[tokio::test]
async fn rounds_match_port_calls() {
    let port = Arc::new(canned_port(3, 4));
    let orchestrator = scripted_orchestrator(port.clone());

    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(4))
        .await
        .expect("canned run must complete");

    assert_eq!(state.current_round as usize, port.call_count());
    let attempts = PromptRole::ALL
        .iter()
        .map(|role| attempts_for(&state, *role))
        .sum::<usize>();
    assert_eq!(attempts, port.call_count());
}

/// Scenario: a critical call that always fails is attempted exactly
/// `max_attempts` times, each audited, and the run fails in that phase.
#[tokio::test]
async fn exhausted_critical_call_fails_the_phase() {
    let port = Arc::new(canned_port(3, 4));
    port.fail_always(PromptRole::CharacterCreator);
    let store = Arc::new(MemoryStore::new());
    let orchestrator = scripted_orchestrator(port.clone()).with_store(store.clone());

    let mut state = EvolutionState::new(Arc::new(fixture_world()), 500);
    let err = orchestrator
        .run_pipeline(&mut state, Some(4))
        .await
        .expect_err("character creation cannot succeed");

    assert_eq!(err.failed_phase(), Some(Phase::CharactersAndRelationships));
    assert!(err.to_string().contains("create character char_0"));
    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(port.calls_for(PromptRole::CharacterCreator), 3);
    assert_eq!(attempts_for(&state, PromptRole::CharacterCreator), 3);
    assert!(state.characters.is_empty());

    let failed = state
        .action_log
        .iter()
        .find(|e| e.description == "phase_failed")
        .expect("failure must be logged");
    assert_eq!(failed.details["phase"], "characters_and_relationships");

    let checkpoint = store
        .get_checkpoint(&state.id)
        .await
        .expect("failed state is checkpointed");
    assert_eq!(checkpoint.phase(), Phase::Failed);
}

/// A transient failure is absorbed by the retry and the run completes.
#[tokio::test]
async fn transient_failure_is_retried() {
    let port = Arc::new(canned_port(2, 3));
    port.push(
        PromptRole::ForeshadowArchitect,
        saga_test_utils::Reply::Text("sorry, no json today".into()),
    );
    let orchestrator = scripted_orchestrator(port.clone());

    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(3))
        .await
        .expect("second attempt must succeed");

    assert_eq!(port.calls_for(PromptRole::ForeshadowArchitect), 2);
    assert_eq!(state.foreshadow_plan.len(), 5);
}

/// A network below the expected size is kept and flagged, not rejected.
#[tokio::test]
async fn small_foreshadow_network_is_kept_with_a_warning() {
    let port = Arc::new(canned_port(3, 4));
    let mut plan = saga_test_utils::foreshadow_plan();
    plan["foreshadows"].as_array_mut().unwrap().truncate(2);
    port.push_text(PromptRole::ForeshadowArchitect, plan.to_string());
    let orchestrator = scripted_orchestrator(port);

    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(4))
        .await
        .expect("a short network is not fatal");

    assert_eq!(state.foreshadow_plan.len(), 2);
    assert!(state
        .warnings()
        .iter()
        .any(|w| w.details["message"] == "2 foreshadows planned, expected 5-10"));
}

/// Enrichment failures fall back and never abort the run.
#[tokio::test]
async fn enrichment_failures_do_not_abort() {
    let port = Arc::new(canned_port(3, 4));
    for role in [
        PromptRole::RelationshipEvolutionist,
        PromptRole::ForeshadowValidator,
        PromptRole::ConflictHierarchist,
        PromptRole::ChapterRefiner,
    ] {
        port.fail_always(role);
    }
    let orchestrator = scripted_orchestrator(port);

    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(4))
        .await
        .expect("enrichment failures are not fatal");

    assert_eq!(state.phase(), Phase::Done);
    let fallbacks = state
        .action_log
        .iter()
        .filter(|e| e.description == "enrichment_fallback")
        .count();
    assert!(fallbacks >= 4);
    assert!(state.conflict_hierarchy.is_some());
    assert!(state
        .chapter_plan
        .as_ref()
        .is_some_and(|p| !p.refinement_notes.is_empty()));
}

/// Without a requested count the story length decides the chapter count.
#[tokio::test]
async fn story_length_sets_default_chapter_count() {
    let port = Arc::new(canned_port(2, 10));
    let config = EvolutionConfig::new().with_story_length(StoryLength::Short);
    let orchestrator = scripted_orchestrator_with(port, config);

    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), None)
        .await
        .expect("canned run must complete");

    assert_eq!(state.chapter_plan.map(|p| p.total_chapters), Some(10));
}

/// A soft round cap that is exceeded does not stop the run.
#[tokio::test]
async fn round_cap_is_soft() {
    let port = Arc::new(canned_port(2, 3));
    let config = EvolutionConfig::new().with_max_rounds(5);
    let orchestrator = scripted_orchestrator_with(port, config);

    let state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(3))
        .await
        .expect("round cap is telemetry only");

    assert!(state.current_round > 5);
    assert_eq!(state.phase(), Phase::Done);
}

/// A state that already ran cannot be run again.
#[tokio::test]
async fn pipeline_requires_fresh_state() {
    let port = Arc::new(canned_port(2, 3));
    let orchestrator = scripted_orchestrator(port);

    let mut state = orchestrator
        .execute_full_evolution(Arc::new(fixture_world()), Some(3))
        .await
        .expect("canned run must complete");

    let err = orchestrator
        .run_pipeline(&mut state, Some(3))
        .await
        .expect_err("finished state cannot restart");
    assert!(matches!(err, EvolutionError::NotReady { .. }));
}
