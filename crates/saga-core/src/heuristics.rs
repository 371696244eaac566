//! Pure functions over generated state
//!
//! Nothing here calls a generation backend; every function is deterministic
//! for a given input.

use crate::labels::{ConflictType, StoryStructure};
use crate::model::{
    ChapterMetrics, CharacterId, CharacterState, ConflictThread, ForeshadowPlan,
    ForeshadowTracking, KeyEvent,
};
use std::collections::BTreeMap;

/// Separator between the two ids of a relationship key
pub const KEY_SEPARATOR: &str = "_";

/// Canonical key for the unordered pair `(a, b)`
#[must_use]
pub fn relationship_key(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}{KEY_SEPARATOR}{hi}")
}

/// Protagonist score
///
/// `10·relationships + 15·internal conflicts + 10·[want] + 15·[need] + 5·secrets`
#[must_use]
pub fn protagonist_score(character: &CharacterState) -> u32 {
    let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    let mut score = 10u32.saturating_mul(count(character.relationships.len()));
    score = score.saturating_add(15u32.saturating_mul(count(character.internal_conflicts.len())));
    if !character.desires.conscious_want.is_empty() {
        score = score.saturating_add(10);
    }
    if !character.desires.unconscious_need.is_empty() {
        score = score.saturating_add(15);
    }
    score.saturating_add(5u32.saturating_mul(count(character.secrets.len())))
}

/// Character with the strictly greatest positive score
///
/// Iterates in id order, so ties resolve to the lowest id. Returns `None`
/// when no character scores above zero.
#[must_use]
pub fn identify_protagonist(characters: &BTreeMap<CharacterId, CharacterState>) -> Option<CharacterId> {
    let mut best: Option<(&CharacterId, u32)> = None;
    for (id, character) in characters {
        let score = protagonist_score(character);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((id, score));
        }
    }
    best.map(|(id, _)| id.clone())
}

/// Hero's journey when any conflict is internal, three acts otherwise
#[must_use]
pub fn select_structure(conflicts: &[ConflictThread]) -> StoryStructure {
    if conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::Internal)
    {
        StoryStructure::HerosJourney
    } else {
        StoryStructure::ThreeAct
    }
}

/// Highest-intensity conflict; the earliest wins ties
#[must_use]
pub fn find_main_conflict(conflicts: &[ConflictThread]) -> Option<&ConflictThread> {
    conflicts
        .iter()
        .fold(None, |best: Option<&ConflictThread>, c| match best {
            Some(b) if b.intensity >= c.intensity => Some(b),
            _ => Some(c),
        })
}

/// Conflict driving `chapter` (1-based), rotating through the list
#[must_use]
pub fn conflict_for_chapter(conflicts: &[ConflictThread], chapter: u32) -> Option<&ConflictThread> {
    if conflicts.is_empty() {
        return None;
    }
    let index = (chapter.saturating_sub(1) as usize) % conflicts.len();
    conflicts.get(index)
}

/// Whether an unresolved conflict is above `threshold`
#[must_use]
pub fn has_high_tension(conflicts: &[ConflictThread], threshold: u8) -> bool {
    conflicts
        .iter()
        .any(|c| !c.resolved && c.intensity > threshold)
}

/// Link each key event to a foreshadow planted in the chapter numbered like
/// the event's sequence
///
/// Event order is not chapter order, so this can mis-link; it is an
/// approximation kept for its simplicity. When several foreshadows are planted
/// in that chapter, the last one in plan order wins.
#[must_use]
pub fn link_foreshadows(events: &[KeyEvent], plan: &[ForeshadowPlan]) -> BTreeMap<String, String> {
    events
        .iter()
        .filter_map(|event| {
            plan.iter()
                .rev()
                .find(|f| f.plant_chapter == event.sequence)
                .map(|f| (event.id.clone(), f.id.clone()))
        })
        .collect()
}

/// Planted, paid-off and active foreshadows for `chapter`
///
/// The three sets are disjoint: a plan whose plant and payoff share a chapter
/// counts as planted only.
#[must_use]
pub fn chapter_foreshadow_tracking(plan: &[ForeshadowPlan], chapter: u32) -> ForeshadowTracking {
    let mut tracking = ForeshadowTracking::default();
    for f in plan {
        if f.plant_chapter == chapter {
            tracking.planted.push(f.id.clone());
        } else if f.payoff_chapter == chapter {
            tracking.paid_off.push(f.id.clone());
        } else if f.plant_chapter < chapter && chapter < f.payoff_chapter {
            tracking.active.push(f.id.clone());
        }
    }
    tracking
}

/// `base_words + words_per_scene · scenes`
#[must_use]
pub fn estimate_chapter_metrics(base_words: u32, words_per_scene: u32, scene_count: usize) -> ChapterMetrics {
    let scene_count = u32::try_from(scene_count).unwrap_or(u32::MAX);
    ChapterMetrics {
        scene_count,
        word_count: base_words.saturating_add(words_per_scene.saturating_mul(scene_count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::CharacterRole;
    use crate::model::{RelationshipState, DEFAULT_CONFLICT_INTENSITY};
    use proptest::prelude::*;

    fn character(id: &str) -> CharacterState {
        CharacterState::new(id, id, CharacterRole::Supporting)
    }

    fn conflict(id: &str, kind: ConflictType, intensity: u8) -> ConflictThread {
        ConflictThread {
            id: id.into(),
            conflict_type: kind,
            core_question: String::new(),
            participants: Vec::new(),
            stakes: String::new(),
            evolution_path: Vec::new(),
            resolved: false,
            intensity,
        }
    }

    fn foreshadow(id: &str, plant: u32, payoff: u32) -> ForeshadowPlan {
        ForeshadowPlan {
            id: id.into(),
            content: String::new(),
            kind: String::new(),
            plant_chapter: plant,
            plant_scene: 1,
            payoff_chapter: payoff,
            payoff_scene: 1,
            importance: String::new(),
        }
    }

    #[test]
    fn key_is_ordered_lexicographically() {
        assert_eq!(relationship_key("char_2", "char_1"), "char_1_char_2");
    }

    #[test]
    fn score_weights_every_term() {
        let mut c = character("char_0");
        c.relationships.insert("char_1".into(), RelationshipState::default());
        c.internal_conflicts.push("duty against love".into());
        c.desires.conscious_want = "revenge".into();
        c.desires.unconscious_need = "forgiveness".into();
        c.secrets.push("is the heir".into());
        assert_eq!(protagonist_score(&c), 10 + 15 + 10 + 15 + 5);
    }

    #[test]
    fn protagonist_is_highest_scorer() {
        let mut characters = BTreeMap::new();
        let mut a = character("char_0");
        a.secrets.push("x".into());
        let mut b = character("char_1");
        b.internal_conflicts.push("y".into());
        characters.insert(a.id.clone(), a);
        characters.insert(b.id.clone(), b);

        assert_eq!(identify_protagonist(&characters).as_deref(), Some("char_1"));
    }

    #[test]
    fn protagonist_ties_go_to_lowest_id() {
        let mut characters = BTreeMap::new();
        for id in ["char_2", "char_1"] {
            let mut c = character(id);
            c.secrets.push("same".into());
            characters.insert(c.id.clone(), c);
        }
        assert_eq!(identify_protagonist(&characters).as_deref(), Some("char_1"));
    }

    #[test]
    fn zero_scores_yield_no_protagonist() {
        let mut characters = BTreeMap::new();
        characters.insert("char_0".to_string(), character("char_0"));
        assert_eq!(identify_protagonist(&characters), None);
    }

    #[test]
    fn internal_conflict_selects_heros_journey() {
        let conflicts = vec![
            conflict("conflict_0", ConflictType::Societal, 5),
            conflict("conflict_1", ConflictType::Internal, 3),
        ];
        assert_eq!(select_structure(&conflicts), StoryStructure::HerosJourney);
        assert_eq!(select_structure(&conflicts[..1]), StoryStructure::ThreeAct);
        assert_eq!(select_structure(&[]), StoryStructure::ThreeAct);
    }

    #[test]
    fn main_conflict_prefers_earliest_on_tie() {
        let conflicts = vec![
            conflict("conflict_0", ConflictType::Societal, DEFAULT_CONFLICT_INTENSITY),
            conflict("conflict_1", ConflictType::Nature, 9),
            conflict("conflict_2", ConflictType::Internal, 9),
        ];
        assert_eq!(find_main_conflict(&conflicts).map(|c| c.id.as_str()), Some("conflict_1"));
        assert!(find_main_conflict(&[]).is_none());
    }

    #[test]
    fn chapter_conflict_rotates() {
        let conflicts = vec![
            conflict("conflict_0", ConflictType::Societal, 5),
            conflict("conflict_1", ConflictType::Nature, 5),
        ];
        assert_eq!(conflict_for_chapter(&conflicts, 1).map(|c| c.id.as_str()), Some("conflict_0"));
        assert_eq!(conflict_for_chapter(&conflicts, 4).map(|c| c.id.as_str()), Some("conflict_1"));
        assert!(conflict_for_chapter(&[], 1).is_none());
    }

    #[test]
    fn resolved_conflicts_do_not_raise_tension() {
        let mut hot = conflict("conflict_0", ConflictType::Societal, 9);
        assert!(has_high_tension(std::slice::from_ref(&hot), 8));
        hot.resolved = true;
        assert!(!has_high_tension(&[hot], 8));
    }

    #[test]
    fn events_link_by_sequence_number() {
        let events = vec![
            KeyEvent {
                id: "event_0".into(),
                sequence: 1,
                name: String::new(),
                description: String::new(),
                participants: Vec::new(),
                consequences: Vec::new(),
            },
            KeyEvent {
                id: "event_1".into(),
                sequence: 2,
                name: String::new(),
                description: String::new(),
                participants: Vec::new(),
                consequences: Vec::new(),
            },
        ];
        let plan = vec![
            foreshadow("foreshadow_0", 2, 6),
            foreshadow("foreshadow_1", 4, 6),
            foreshadow("foreshadow_2", 2, 5),
        ];
        let links = link_foreshadows(&events, &plan);
        assert_eq!(links.len(), 1);
        assert_eq!(links["event_1"], "foreshadow_2");
    }

    #[test]
    fn tracking_by_chapter_range() {
        let plan = vec![
            foreshadow("f_a", 1, 5),
            foreshadow("f_b", 3, 3),
            foreshadow("f_c", 2, 3),
            foreshadow("f_d", 4, 8),
        ];
        let t = chapter_foreshadow_tracking(&plan, 3);
        assert_eq!(t.planted, vec!["f_b"]);
        assert_eq!(t.paid_off, vec!["f_c"]);
        assert_eq!(t.active, vec!["f_a"]);
    }

    #[test]
    fn metrics_add_words_per_scene() {
        let m = estimate_chapter_metrics(3000, 500, 5);
        assert_eq!(m.word_count, 5500);
        assert_eq!(m.scene_count, 5);
    }

    proptest! {
        #[test]
        fn key_is_symmetric(a in "[a-z_0-9]{0,12}", b in "[a-z_0-9]{0,12}") {
            prop_assert_eq!(relationship_key(&a, &b), relationship_key(&b, &a));
        }

        #[test]
        fn tracking_sets_are_disjoint(
            chapters in proptest::collection::vec((1u32..12, 1u32..12), 0..10),
            chapter in 1u32..12,
        ) {
            let plan: Vec<_> = chapters
                .iter()
                .enumerate()
                .map(|(i, (p, q))| foreshadow(&format!("f_{i}"), *p, *q))
                .collect();
            let t = chapter_foreshadow_tracking(&plan, chapter);
            for id in &t.planted {
                prop_assert!(!t.paid_off.contains(id) && !t.active.contains(id));
            }
            for id in &t.paid_off {
                prop_assert!(!t.active.contains(id));
            }
        }

        #[test]
        fn dominated_character_never_wins(extra in 1usize..4) {
            let mut strong = character("char_1");
            let weak = character("char_0");
            for i in 0..extra {
                strong.secrets.push(format!("s{i}"));
                strong.internal_conflicts.push(format!("c{i}"));
            }
            let mut characters = BTreeMap::new();
            characters.insert(weak.id.clone(), weak);
            characters.insert(strong.id.clone(), strong);
            let protagonist = identify_protagonist(&characters);
            prop_assert_eq!(protagonist.as_deref(), Some("char_1"));
        }
    }
}
