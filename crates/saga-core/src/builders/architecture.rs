//! Story architecture: world analysis, narrative mode, roster, conflict direction

use super::schema::{
    ConflictDeepeningResponse, ConflictDirectionResponse, ModeSelectionResponse, RosterResponse,
    WorldAnalysisResponse,
};
use super::{critical, enrich, prompts};
use crate::error::StepError;
use crate::model::{CharacterRoster, StoryArchitecture, WorldAnalysis};
use crate::state::EvolutionState;
use saga_generation::{PromptRole, RetryingCaller};
use serde_json::json;

/// Analyse the world and select a narrative mode
///
/// # Errors
/// Fails when either the analysis or the mode selection is exhausted.
pub async fn select_narrative_mode(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
) -> Result<(WorldAnalysis, ModeSelectionResponse), StepError> {
    let prompt = prompts::world_analysis(state);
    let analysis: WorldAnalysisResponse = critical(
        caller,
        state,
        PromptRole::StoryArchitectureAnalyzer,
        &prompt,
        "analyze world",
    )
    .await?;
    state.log_action(
        "world_analysis",
        json!({
            "core_tensions": analysis.core_tensions,
            "suggested_modes": analysis.suggested_modes,
        }),
    );

    let prompt = prompts::mode_selection(state, &analysis);
    let selection: ModeSelectionResponse = critical(
        caller,
        state,
        PromptRole::NarrativeModeSelector,
        &prompt,
        "select narrative mode",
    )
    .await?;
    state.log_action(
        "mode_selection",
        json!({ "mode": selection.mode(), "reasoning": selection.reasoning }),
    );

    let analysis = WorldAnalysis {
        core_tensions: analysis.core_tensions,
        story_potential: analysis.story_potential.join("; "),
        complexity: analysis.complexity,
        suggested_modes: analysis.suggested_modes,
    };
    Ok((analysis, selection))
}

/// Size the character roster for `mode`
///
/// # Errors
/// Fails when the roster call is exhausted.
pub async fn plan_character_roster(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    mode: &str,
) -> Result<CharacterRoster, StepError> {
    let prompt = prompts::roster_planning(state, mode);
    let r: RosterResponse = critical(
        caller,
        state,
        PromptRole::CharacterRosterPlanner,
        &prompt,
        "plan character roster",
    )
    .await?;

    let defaults = CharacterRoster::default();
    let roster = CharacterRoster {
        total_characters: r.total_characters,
        protagonists: r.protagonist_count,
        antagonists: r.antagonist_count,
        supporting: r.supporting_count,
        network_type: if r.network_structure.trim().is_empty() {
            defaults.network_type
        } else {
            r.network_structure
        },
    };
    state.log_action(
        "roster_planning",
        json!({ "total_characters": roster.total_characters, "network_type": roster.network_type }),
    );
    Ok(roster)
}

/// Identify the core conflict direction and thematic core
///
/// The first pass is critical; the deepening pass is enrichment and falls
/// back to the first-pass direction.
///
/// # Errors
/// Fails when the first pass is exhausted.
pub async fn identify_conflict_direction(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    mode: &str,
    roster: &CharacterRoster,
) -> Result<(String, String), StepError> {
    let prompt = prompts::conflict_direction(state, mode, roster.total_characters);
    let first: ConflictDirectionResponse = critical(
        caller,
        state,
        PromptRole::ConflictArchitect,
        &prompt,
        "identify conflict direction",
    )
    .await?;
    state.log_action(
        "conflict_identification",
        json!({
            "primary": first.primary_conflicts,
            "direction": first.conflict_direction,
            "thematic_core": first.thematic_core,
        }),
    );

    let prompt = prompts::conflict_deepening(&first.conflict_direction, &first.thematic_core);
    let direction = match enrich::<ConflictDeepeningResponse>(
        caller,
        state,
        PromptRole::ConflictArchitect,
        &prompt,
    )
    .await
    {
        Some(deeper) => {
            state.log_action(
                "conflict_deepening",
                json!({ "refined": deeper.refined_direction, "layers": deeper.conflict_layers }),
            );
            deeper.refined_direction
        }
        None => first.conflict_direction,
    };
    Ok((direction, first.thematic_core))
}

/// Run the whole architecture phase
///
/// # Errors
/// Fails on the first exhausted critical call.
pub async fn design_architecture(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
) -> Result<StoryArchitecture, StepError> {
    let (world_analysis, selection) = select_narrative_mode(caller, state).await?;
    let mode = selection.mode();
    let roster = plan_character_roster(caller, state, mode.label()).await?;
    let (core_conflict_type, thematic_core) =
        identify_conflict_direction(caller, state, mode.label(), &roster).await?;

    tracing::info!(
        "architecture: mode {}, {} characters, direction {:?}",
        mode,
        roster.total_characters,
        core_conflict_type
    );
    Ok(StoryArchitecture {
        narrative_mode: mode,
        mode_rationale: selection.reasoning,
        core_conflict_type,
        thematic_core,
        roster,
        world_analysis,
    })
}
