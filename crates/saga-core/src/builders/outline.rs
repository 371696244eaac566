//! Global outline: opening, key events, climax

use super::schema::{ClimaxResponse, KeyEventsResponse, StoryDirectionResponse};
use super::{critical, prompts};
use crate::error::StepError;
use crate::heuristics::link_foreshadows;
use crate::model::{GlobalOutline, KeyEvent};
use crate::state::EvolutionState;
use saga_generation::{PromptRole, RetryingCaller};
use serde_json::json;

/// Plan the global outline and link key events to foreshadows
///
/// # Errors
/// Fails when the direction, key events or climax call is exhausted.
pub async fn plan_global_outline(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
) -> Result<GlobalOutline, StepError> {
    let prompt = prompts::story_direction(state);
    let direction: StoryDirectionResponse = critical(
        caller,
        state,
        PromptRole::StoryArchitect,
        &prompt,
        "plan story direction",
    )
    .await?;
    state.log_action(
        "story_direction",
        json!({ "opening": direction.opening, "themes": direction.themes }),
    );

    let prompt = prompts::key_events(state, &direction.opening, &direction.direction);
    let events: KeyEventsResponse = critical(
        caller,
        state,
        PromptRole::PlotDesigner,
        &prompt,
        "design key events",
    )
    .await?;
    let key_events: Vec<KeyEvent> = events
        .events
        .into_iter()
        .enumerate()
        .map(|(i, e)| KeyEvent {
            id: if e.id.trim().is_empty() {
                format!("event_{i}")
            } else {
                e.id
            },
            sequence: u32::try_from(i + 1).unwrap_or(u32::MAX),
            name: e.name,
            description: e.description,
            participants: e.characters,
            consequences: e.consequences,
        })
        .collect();
    state.log_action("key_events", json!({ "count": key_events.len() }));

    let prompt = prompts::climax(&key_events);
    let ending: ClimaxResponse = critical(
        caller,
        state,
        PromptRole::ClimaxDesigner,
        &prompt,
        "design climax",
    )
    .await?;

    let event_foreshadows = link_foreshadows(&key_events, &state.foreshadow_plan);
    state.log_action(
        "foreshadows_linked",
        json!({ "links": event_foreshadows.len() }),
    );

    let outline = GlobalOutline {
        opening: direction.opening,
        main_direction: direction.direction,
        key_events,
        climax: ending.climax,
        resolution: ending.resolution,
        event_foreshadows,
    };
    tracing::info!(
        "global outline: {} key events, {} linked foreshadows",
        outline.key_events.len(),
        outline.event_foreshadows.len()
    );
    state.global_outline = Some(outline.clone());
    Ok(outline)
}
