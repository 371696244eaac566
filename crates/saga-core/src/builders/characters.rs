//! Character creation sub-protocol
//!
//! Each character takes three rounds: basic identity, psychological
//! deepening, and a network-positioning placeholder resolved later by the
//! relationship batch call.

use super::schema::{CharacterBasicResponse, CharacterDepthResponse};
use super::{critical, prompts};
use crate::error::StepError;
use crate::model::{CharacterId, CharacterState, DesireSystem, EmotionalState};
use crate::state::EvolutionState;
use saga_generation::{PromptRole, RetryingCaller};
use serde_json::json;

/// Id of the `index`-th created character
#[inline]
#[must_use]
pub fn character_id(index: usize) -> CharacterId {
    format!("char_{index}")
}

/// Create character `index` of `total` and insert it into the state
///
/// # Errors
/// Fails when the basic or the deepening round is exhausted.
pub async fn create_character(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    index: usize,
    total: u32,
) -> Result<CharacterId, StepError> {
    let id = character_id(index);
    let step = format!("create character {id}");

    let prompt = prompts::character_creation(state, index, total);
    let basic: CharacterBasicResponse =
        critical(caller, state, PromptRole::CharacterCreator, &prompt, step.as_str()).await?;

    let mut character = CharacterState::new(id.clone(), basic.name.trim(), basic.parsed_role());
    character.age = basic.age.clone();
    character.background = basic.background.clone();
    character.personality = basic.personality.join(", ");
    character.core_traits = basic.core_traits.clone();
    character.flaws = basic.flaws.clone();
    character.desires = DesireSystem {
        conscious_want: basic.conscious_want.clone(),
        unconscious_need: basic.unconscious_need.clone(),
        ..DesireSystem::default()
    };
    state.characters.insert(id.clone(), character);
    state.log_action(
        "character_created",
        json!({ "id": id, "name": basic.name, "role": basic.parsed_role() }),
    );

    deepen_character(caller, state, &id).await?;

    // Positioning is settled by the relationship batch call once every
    // character exists.
    state.log_action("network_positioning", json!({ "id": id, "deferred": true }));

    tracing::info!("created character {} ({})", id, state.character_name(&id));
    Ok(id)
}

/// Fill in internal conflicts, secrets, fears and emotional triggers
///
/// # Errors
/// Fails when the deepening round is exhausted.
pub async fn deepen_character(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    id: &str,
) -> Result<(), StepError> {
    let prompt = prompts::character_deepening(state, id);
    let depth: CharacterDepthResponse = critical(
        caller,
        state,
        PromptRole::CharacterPsychologist,
        &prompt,
        format!("deepen character {id}"),
    )
    .await?;

    let conflicts = depth.internal_conflicts.len();
    if let Some(c) = state.characters.get_mut(id) {
        c.internal_conflicts = depth.internal_conflicts;
        c.secrets = depth.secrets;
        c.desires.fear = depth.fears.join("; ");
        c.desires.want_need_gap = depth.want_vs_need_gap;
        c.emotions = EmotionalState {
            triggers: depth.triggers,
            masking_behaviors: depth.masking_behaviors,
            ..EmotionalState::default()
        };
    }
    state.log_action(
        "character_deepened",
        json!({ "id": id, "internal_conflicts": conflicts }),
    );
    Ok(())
}

/// Create the whole roster in order
///
/// # Errors
/// Fails on the first character whose critical rounds are exhausted.
pub async fn create_characters(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    total: u32,
) -> Result<Vec<CharacterId>, StepError> {
    let mut ids = Vec::with_capacity(total as usize);
    for index in 0..total as usize {
        ids.push(create_character(caller, state, index, total).await?);
    }
    Ok(ids)
}
