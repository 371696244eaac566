//! Foreshadow network planning and validation

use super::schema::{ForeshadowPlanResponse, ForeshadowValidationResponse};
use super::{critical, enrich, prompts};
use crate::error::StepError;
use crate::model::{ForeshadowPlan, ForeshadowValidation};
use crate::phase::Phase;
use crate::state::{EvolutionState, ValidationWarning};
use saga_generation::{PromptRole, RetryingCaller};
use serde_json::json;
use std::ops::RangeInclusive;

/// Expected size of a foreshadow network
pub const FORESHADOW_COUNT: RangeInclusive<usize> = 5..=10;

/// Warning for a network whose size falls outside [`FORESHADOW_COUNT`]
#[must_use]
pub fn foreshadow_count_warning(count: usize) -> Option<ValidationWarning> {
    (!FORESHADOW_COUNT.contains(&count)).then(|| {
        ValidationWarning::new(
            Phase::Foreshadow,
            format!(
                "{count} foreshadows planned, expected {}-{}",
                FORESHADOW_COUNT.start(),
                FORESHADOW_COUNT.end()
            ),
        )
    })
}

/// Plan the foreshadow network
///
/// Empty ids default to `foreshadow_{i}`. A payoff scheduled before its plant
/// is kept; [`validate_foreshadows`] reports it. A network outside
/// [`FORESHADOW_COUNT`] is kept with a validation warning.
///
/// # Errors
/// Fails when the planning call is exhausted.
pub async fn plan_foreshadows(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
) -> Result<usize, StepError> {
    let prompt = prompts::foreshadow_planning(state);
    let response: ForeshadowPlanResponse = critical(
        caller,
        state,
        PromptRole::ForeshadowArchitect,
        &prompt,
        "plan foreshadow network",
    )
    .await?;

    state.foreshadow_plan = response
        .foreshadows
        .into_iter()
        .enumerate()
        .map(|(i, f)| ForeshadowPlan {
            id: if f.id.trim().is_empty() {
                format!("foreshadow_{i}")
            } else {
                f.id
            },
            content: f.content,
            kind: f.kind,
            plant_chapter: f.plant_chapter,
            plant_scene: f.plant_scene,
            payoff_chapter: f.payoff_chapter,
            payoff_scene: f.payoff_scene,
            importance: f.importance,
        })
        .collect();

    let count = state.foreshadow_plan.len();
    state.log_action("foreshadow_planned", json!({ "count": count }));
    if let Some(warning) = foreshadow_count_warning(count) {
        state.record_warning(warning);
    }
    Ok(count)
}

/// Payoff-before-plant defects found without any generation call
#[must_use]
pub fn local_foreshadow_check(plan: &[ForeshadowPlan]) -> ForeshadowValidation {
    let early: Vec<&ForeshadowPlan> = plan.iter().filter(|f| f.pays_off_early()).collect();
    ForeshadowValidation {
        complete: early.is_empty(),
        issues: early
            .iter()
            .map(|f| {
                format!(
                    "{} pays off in chapter {} before it is planted in chapter {}",
                    f.id, f.payoff_chapter, f.plant_chapter
                )
            })
            .collect(),
        suggestions: Vec::new(),
        missing_payoffs: early.iter().map(|f| f.id.clone()).collect(),
    }
}

/// Check the plan for completeness; report only
///
/// The generated report is merged with [`local_foreshadow_check`]. Every
/// issue becomes a [`ValidationWarning`]; nothing here fails the phase.
pub async fn validate_foreshadows(caller: &RetryingCaller, state: &mut EvolutionState) -> ForeshadowValidation {
    let mut report = local_foreshadow_check(&state.foreshadow_plan);

    let prompt = prompts::foreshadow_validation(&state.foreshadow_plan);
    if let Some(remote) = enrich::<ForeshadowValidationResponse>(
        caller,
        state,
        PromptRole::ForeshadowValidator,
        &prompt,
    )
    .await
    {
        report.complete = report.complete && remote.is_valid;
        report.issues.extend(remote.issues);
        report.suggestions = remote.suggestions;
        for id in remote.missing_payoffs {
            if !report.missing_payoffs.contains(&id) {
                report.missing_payoffs.push(id);
            }
        }
    }

    for issue in &report.issues {
        state.record_warning(ValidationWarning::new(Phase::Foreshadow, issue.clone()));
    }
    if !report.complete && report.issues.is_empty() {
        state.record_warning(ValidationWarning::new(
            Phase::Foreshadow,
            "foreshadow network reported incomplete",
        ));
    }
    state.foreshadow_validation = Some(report.clone());
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(id: &str, plant: u32, payoff: u32) -> ForeshadowPlan {
        ForeshadowPlan {
            id: id.into(),
            content: "hint".into(),
            kind: "object".into(),
            plant_chapter: plant,
            plant_scene: 1,
            payoff_chapter: payoff,
            payoff_scene: 1,
            importance: "minor".into(),
        }
    }

    #[test]
    fn early_payoff_is_an_issue() {
        let report = local_foreshadow_check(&[plan("f1", 2, 6), plan("f2", 5, 3)]);
        assert!(!report.complete);
        assert_eq!(report.missing_payoffs, vec!["f2"]);
        assert!(report.issues[0].contains("before it is planted"));
    }

    #[test]
    fn network_size_outside_range_warns() {
        assert!(foreshadow_count_warning(5).is_none());
        assert!(foreshadow_count_warning(10).is_none());
        let warning = foreshadow_count_warning(3).unwrap();
        assert_eq!(warning.phase, Phase::Foreshadow);
        assert_eq!(warning.message, "3 foreshadows planned, expected 5-10");
        assert!(foreshadow_count_warning(11).is_some());
    }

    #[test]
    fn ordered_plan_is_complete() {
        let report = local_foreshadow_check(&[plan("f1", 1, 1), plan("f2", 2, 9)]);
        assert!(report.complete);
        assert!(report.issues.is_empty());
    }
}
