//! Chapter plan: key-event assignment and transition refinement

use super::schema::{ChapterAssignmentResponse, ChapterItem, ChapterRefinementResponse};
use super::{critical, enrich, prompts};
use crate::error::StepError;
use crate::model::{ChapterPlan, ChapterSynopsis, ForeshadowOps, ForeshadowPlan};
use crate::state::EvolutionState;
use saga_generation::{PromptRole, RetryingCaller};
use serde_json::json;

/// Refinement note recorded when the refinement call fails
pub const FALLBACK_REFINEMENT_NOTE: &str = "transitions kept as assigned";

/// Plant and payoff operations that fall in `chapter`
#[must_use]
pub fn chapter_foreshadow_ops(plan: &[ForeshadowPlan], chapter: u32) -> ForeshadowOps {
    ForeshadowOps {
        plant: plan
            .iter()
            .filter(|f| f.plant_chapter == chapter)
            .map(|f| f.id.clone())
            .collect(),
        payoff: plan
            .iter()
            .filter(|f| f.payoff_chapter == chapter)
            .map(|f| f.id.clone())
            .collect(),
    }
}

fn synopsis(item: ChapterItem, plan: &[ForeshadowPlan]) -> ChapterSynopsis {
    let title = if item.title.trim().is_empty() {
        format!("Chapter {}", item.chapter)
    } else {
        item.title
    };
    ChapterSynopsis {
        chapter: item.chapter,
        title,
        summary: item.summary,
        purpose: item.purpose,
        key_events: item.key_events,
        foreshadows: chapter_foreshadow_ops(plan, item.chapter),
        ending_hook: item.ending_hook,
    }
}

/// Assign key events to `chapter_count` chapters
///
/// Chapters are sorted by number; a number given twice keeps its first entry.
///
/// # Errors
/// Fails when the assignment call is exhausted.
pub async fn assign_chapters(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    chapter_count: u32,
) -> Result<ChapterPlan, StepError> {
    let prompt = prompts::chapter_assignment(state, chapter_count);
    let response: ChapterAssignmentResponse = critical(
        caller,
        state,
        PromptRole::ChapterPlanner,
        &prompt,
        format!("assign {chapter_count} chapters"),
    )
    .await?;

    let mut chapters: Vec<ChapterSynopsis> = response
        .chapters
        .into_iter()
        .map(|item| synopsis(item, &state.foreshadow_plan))
        .collect();
    chapters.sort_by_key(|c| c.chapter);
    chapters.dedup_by_key(|c| c.chapter);

    if chapters.len() != chapter_count as usize {
        tracing::warn!(
            "chapter plan has {} chapters, {} requested",
            chapters.len(),
            chapter_count
        );
    }
    state.log_action(
        "chapters_assigned",
        json!({ "requested": chapter_count, "planned": chapters.len() }),
    );

    let plan = ChapterPlan {
        total_chapters: chapter_count,
        chapters,
        refinement_notes: Vec::new(),
    };
    state.chapter_plan = Some(plan.clone());
    Ok(plan)
}

/// Refine transitions between chapters; advisory only
pub async fn refine_chapters(caller: &RetryingCaller, state: &mut EvolutionState) -> Vec<String> {
    let Some(chapters) = state.chapter_plan.as_ref().map(|p| p.chapters.clone()) else {
        return Vec::new();
    };
    let prompt = prompts::chapter_refinement(&chapters);
    let notes = match enrich::<ChapterRefinementResponse>(caller, state, PromptRole::ChapterRefiner, &prompt).await {
        Some(r) => r
            .transitions
            .into_iter()
            .chain(r.pacing)
            .chain(r.improvements)
            .collect(),
        None => vec![FALLBACK_REFINEMENT_NOTE.to_string()],
    };
    state.log_action("chapters_refined", json!({ "notes": notes.len() }));
    if let Some(plan) = state.chapter_plan.as_mut() {
        plan.refinement_notes.clone_from(&notes);
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_follow_plan_membership() {
        let f = |id: &str, plant, payoff| ForeshadowPlan {
            id: id.into(),
            content: String::new(),
            kind: String::new(),
            plant_chapter: plant,
            plant_scene: 1,
            payoff_chapter: payoff,
            payoff_scene: 1,
            importance: String::new(),
        };
        let plan = [f("a", 1, 3), f("b", 3, 5), f("c", 2, 3)];
        let ops = chapter_foreshadow_ops(&plan, 3);
        assert_eq!(ops.plant, vec!["b"]);
        assert_eq!(ops.payoff, vec!["a", "c"]);
    }
}
