//! Relationship network and its evolution projection

use super::schema::{RelationshipEvolutionResponse, RelationshipNetworkResponse};
use super::{critical, enrich, prompts};
use crate::error::StepError;
use crate::heuristics::{identify_protagonist, relationship_key};
use crate::model::{CharacterEvolutionTracker, Relationship, RelationshipEvolution, RelationshipState};
use crate::phase::Phase;
use crate::state::{EvolutionState, ValidationWarning};
use saga_generation::{PromptRole, RetryingCaller};
use serde_json::json;

/// Tension recorded when an edge carries none
pub const DEFAULT_TENSION: u8 = 5;

/// Build the relationship graph over every created character in one call
///
/// Edges are keyed by [`relationship_key`], so a pair named twice collapses
/// into one edge (the later wins). Each endpoint gets a
/// [`RelationshipState`] towards the other unless it already has one.
///
/// # Errors
/// Fails when the batch call is exhausted.
pub async fn build_relationship_network(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
) -> Result<usize, StepError> {
    let prompt = prompts::relationship_network(state);
    let response: RelationshipNetworkResponse = critical(
        caller,
        state,
        PromptRole::RelationshipArchitect,
        &prompt,
        "build relationship network",
    )
    .await?;

    state.relationship_network.nodes = state.characters.keys().cloned().collect();
    state.relationship_network.network_type = state.roster().network_type;

    for edge in response.relationships {
        let (a, b) = (edge.char_a.trim(), edge.char_b.trim());
        if a == b || !state.characters.contains_key(a) || !state.characters.contains_key(b) {
            state.record_warning(ValidationWarning::new(
                Phase::CharactersAndRelationships,
                format!("skipped relationship between unknown or identical ids {a:?} and {b:?}"),
            ));
            continue;
        }
        let tension = edge.tension.unwrap_or(DEFAULT_TENSION).min(10);
        let key = relationship_key(a, b);

        let endpoint = RelationshipState {
            relation_type: edge.relation_type.clone(),
            tension,
            power_dynamic: edge.power_dynamic.clone(),
            shared_history: edge.shared_history.clone(),
            unspoken_tension: edge.unspoken_tension.clone(),
        };
        for (from, to) in [(a, b), (b, a)] {
            if let Some(c) = state.characters.get_mut(from) {
                c.relationships
                    .entry(to.to_string())
                    .or_insert_with(|| endpoint.clone());
            }
        }

        tracing::debug!("relationship {} ({})", key, edge.relation_type);
        state.relationship_network.edges.insert(
            key,
            Relationship {
                from: a.to_string(),
                to: b.to_string(),
                relation_type: edge.relation_type,
                tension,
                potential: edge.description,
                current_state: "initial".to_string(),
            },
        );
    }

    let count = state.relationship_network.edges.len();
    state.log_action(
        "relationship_network",
        json!({ "edges": count, "network_type": state.relationship_network.network_type }),
    );
    Ok(count)
}

/// Project how each relationship evolves
///
/// Advisory only. On failure every edge gets a flat projection from its
/// current state.
pub async fn project_relationship_evolution(caller: &RetryingCaller, state: &mut EvolutionState) {
    if state.relationship_network.edges.is_empty() {
        return;
    }
    let prompt = prompts::relationship_evolution(state);
    let stages = match enrich::<RelationshipEvolutionResponse>(
        caller,
        state,
        PromptRole::RelationshipEvolutionist,
        &prompt,
    )
    .await
    {
        Some(r) => r
            .evolutions
            .into_iter()
            .map(|e| RelationshipEvolution {
                relation_id: e.relation_id,
                initial_state: e.initial_state,
                evolution: e.evolution.join(" -> "),
                final_state: e.final_state,
                turning_point: e.turning_point,
            })
            .collect(),
        None => state
            .relationship_network
            .edges
            .iter()
            .map(|(key, edge)| RelationshipEvolution {
                relation_id: key.clone(),
                initial_state: edge.relation_type.clone(),
                evolution: String::new(),
                final_state: edge.relation_type.clone(),
                turning_point: String::new(),
            })
            .collect(),
    };
    state.relationship_network.evolution_stages = stages;
    let count = state.relationship_network.evolution_stages.len();
    state.log_action("relationship_evolution", json!({ "projections": count }));
}

/// Pick the protagonist as the network centre and start one tracker per character
pub fn settle_network(state: &mut EvolutionState) -> Option<String> {
    let protagonist = identify_protagonist(&state.characters);
    state.relationship_network.center_node.clone_from(&protagonist);
    for id in state.characters.keys() {
        state
            .character_evolution
            .entry(id.clone())
            .or_insert_with(|| CharacterEvolutionTracker::new(id.clone()));
    }
    state.log_action("protagonist_identified", json!({ "protagonist": protagonist }));
    protagonist
}
