//! Conflict threads, their evolution paths, and advisory tiers

use super::schema::{ConflictDesignResponse, ConflictEvolutionResponse, ConflictHierarchyResponse};
use super::{critical, enrich, prompts};
use crate::error::StepError;
use crate::heuristics::find_main_conflict;
use crate::model::{ConflictHierarchy, ConflictStage, ConflictThread, DEFAULT_CONFLICT_INTENSITY};
use crate::state::EvolutionState;
use saga_generation::{PromptRole, RetryingCaller};
use serde_json::json;

/// Highest intensity on the conflict scale
pub const MAX_INTENSITY: u8 = 10;

/// Intensity at or above which a non-primary conflict is secondary in the fallback tiers
pub const SECONDARY_INTENSITY: u8 = 5;

/// Number of conflicts designed for `characters` characters
#[inline]
#[must_use]
pub fn conflict_count(characters: usize) -> usize {
    characters + 2
}

/// Design conflict `index` of `total` and its evolution path
///
/// # Errors
/// Fails when either the design or the evolution call is exhausted.
pub async fn design_conflict(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    index: usize,
    total: usize,
) -> Result<String, StepError> {
    let id = format!("conflict_{index}");

    let prompt = prompts::conflict_design(state, index, total);
    let design: ConflictDesignResponse = critical(
        caller,
        state,
        PromptRole::ConflictDesigner,
        &prompt,
        format!("design conflict {id}"),
    )
    .await?;

    let mut thread = ConflictThread {
        id: id.clone(),
        conflict_type: design.parsed_type(),
        core_question: design.core_question,
        participants: design.participants,
        stakes: design.stakes,
        evolution_path: Vec::new(),
        resolved: false,
        intensity: design
            .current_intensity
            .unwrap_or(DEFAULT_CONFLICT_INTENSITY)
            .min(MAX_INTENSITY),
    };

    let prompt = prompts::conflict_evolution(&thread);
    let evolution: ConflictEvolutionResponse = critical(
        caller,
        state,
        PromptRole::ConflictEvolutionist,
        &prompt,
        format!("evolve conflict {id}"),
    )
    .await?;
    thread.evolution_path = evolution
        .stages
        .into_iter()
        .enumerate()
        .map(|(i, s)| ConflictStage {
            stage: if s.stage.trim().is_empty() {
                format!("stage {}", i + 1)
            } else {
                s.stage
            },
            intensity: s
                .intensity
                .unwrap_or(DEFAULT_CONFLICT_INTENSITY)
                .min(MAX_INTENSITY),
            description: s.description,
            events: s.events,
        })
        .collect();

    tracing::info!(
        "designed {} [{}] intensity {} with {} stages",
        id,
        thread.conflict_type,
        thread.intensity,
        thread.evolution_path.len()
    );
    state.log_action(
        "conflict_designed",
        json!({
            "id": id,
            "type": thread.conflict_type,
            "intensity": thread.intensity,
            "stages": thread.evolution_path.len(),
        }),
    );
    state.conflicts.push(thread);
    Ok(id)
}

/// Design every conflict for the current cast, in order
///
/// # Errors
/// Fails on the first conflict whose critical calls are exhausted.
pub async fn design_conflicts(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
) -> Result<usize, StepError> {
    let total = conflict_count(state.characters.len());
    for index in 0..total {
        design_conflict(caller, state, index, total).await?;
    }
    Ok(total)
}

/// Tiers by intensity: the strongest conflict is primary, the rest split at
/// [`SECONDARY_INTENSITY`]
#[must_use]
pub fn fallback_hierarchy(conflicts: &[ConflictThread]) -> ConflictHierarchy {
    let primary = find_main_conflict(conflicts).map(|c| c.id.clone());
    let mut hierarchy = ConflictHierarchy {
        primary: primary.iter().cloned().collect(),
        ..ConflictHierarchy::default()
    };
    for c in conflicts {
        if primary.as_deref() == Some(c.id.as_str()) {
            continue;
        }
        if c.intensity >= SECONDARY_INTENSITY {
            hierarchy.secondary.push(c.id.clone());
        } else {
            hierarchy.tertiary.push(c.id.clone());
        }
    }
    hierarchy
}

/// Classify conflicts into primary, secondary and tertiary tiers
///
/// Advisory only; falls back to [`fallback_hierarchy`].
pub async fn classify_conflicts(caller: &RetryingCaller, state: &mut EvolutionState) -> ConflictHierarchy {
    let prompt = prompts::conflict_hierarchy(state);
    let hierarchy = match enrich::<ConflictHierarchyResponse>(
        caller,
        state,
        PromptRole::ConflictHierarchist,
        &prompt,
    )
    .await
    {
        Some(r) => ConflictHierarchy {
            primary: r.primary_conflicts,
            secondary: r.secondary_conflicts,
            tertiary: r.tertiary_conflicts,
            interplay: r.relationships,
        },
        None => fallback_hierarchy(&state.conflicts),
    };
    state.log_action(
        "conflict_hierarchy",
        json!({
            "primary": hierarchy.primary,
            "secondary": hierarchy.secondary.len(),
            "tertiary": hierarchy.tertiary.len(),
        }),
    );
    state.conflict_hierarchy = Some(hierarchy.clone());
    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::ConflictType;

    fn conflict(id: &str, intensity: u8) -> ConflictThread {
        ConflictThread {
            id: id.into(),
            conflict_type: ConflictType::Interpersonal,
            core_question: String::new(),
            participants: Vec::new(),
            stakes: String::new(),
            evolution_path: Vec::new(),
            resolved: false,
            intensity,
        }
    }

    #[test]
    fn count_is_cast_plus_two() {
        assert_eq!(conflict_count(0), 2);
        assert_eq!(conflict_count(3), 5);
    }

    #[test]
    fn fallback_tiers_by_intensity() {
        let tiers = fallback_hierarchy(&[
            conflict("conflict_0", 6),
            conflict("conflict_1", 9),
            conflict("conflict_2", 3),
        ]);
        assert_eq!(tiers.primary, vec!["conflict_1"]);
        assert_eq!(tiers.secondary, vec!["conflict_0"]);
        assert_eq!(tiers.tertiary, vec!["conflict_2"]);
    }

    #[test]
    fn no_conflicts_no_tiers() {
        assert_eq!(fallback_hierarchy(&[]), ConflictHierarchy::default());
    }
}
