//! Narrative blueprint assembly
//!
//! A blueprint is the writer-facing summary of a finished run: a three-act
//! outline, per-chapter plans, scene instructions, character arcs and a
//! theme plan. Assembly never fails. Every prose field it generates has a
//! fixed fallback.

use crate::builders::enrichment::{self, StoryBeat, EXPECTED_SCENE_LENGTH};
use crate::config::EvolutionConfig;
use crate::heuristics::{find_main_conflict, select_structure};
use crate::labels::{ArcType, StoryStructure};
use crate::model::{CharacterId, CharacterState, ConflictThread};
use crate::state::EvolutionState;
use chrono::{DateTime, Utc};
use saga_generation::RetryingCaller;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Lifecycle of a planned chapter or scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Not written yet
    #[default]
    Pending,
    /// Being written
    Generating,
    /// Written
    Completed,
}

/// Act one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActOne {
    /// Setup
    pub setup: String,
    /// Inciting incident
    pub inciting_incident: String,
    /// First plot point
    pub plot_point1: String,
}

/// Act two
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActTwo {
    /// Rising action
    pub rising_action: Vec<String>,
    /// Midpoint
    pub midpoint: String,
    /// Lowest point
    pub all_is_lost: String,
    /// Second plot point
    pub plot_point2: String,
}

/// Act three
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActThree {
    /// Climax
    pub climax: String,
    /// Resolution
    pub resolution: String,
}

/// Three-act outline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOutline {
    /// Macro structure
    pub structure_type: StoryStructure,
    /// Act one
    pub act1: ActOne,
    /// Act two
    pub act2: ActTwo,
    /// Act three
    pub act3: ActThree,
}

/// Writer-facing plan for one chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterBlueprint {
    /// 1-based chapter number
    pub chapter: u32,
    /// Title
    pub title: String,
    /// Purpose
    pub purpose: String,
    /// Key scenes
    pub key_scenes: Vec<String>,
    /// Plot advancement
    pub plot_advancement: String,
    /// Arc progress
    pub arc_progress: String,
    /// Ending hook
    pub ending_hook: String,
    /// Target word count
    pub word_count: u32,
    /// Status
    pub status: PlanStatus,
}

/// Writer-facing instruction for one scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInstruction {
    /// Chapter
    pub chapter: u32,
    /// Scene number within the chapter
    pub scene: u32,
    /// Global sequence across the book
    pub sequence: u32,
    /// Purpose
    pub purpose: String,
    /// Location
    pub location: String,
    /// Character ids present
    pub characters: Vec<CharacterId>,
    /// Point-of-view character id
    pub pov_character: CharacterId,
    /// What happens
    pub action: String,
    /// Dialogue focus
    pub dialogue_focus: String,
    /// Expected words
    pub expected_length: u32,
    /// Mood
    pub mood: String,
    /// Status
    pub status: PlanStatus,
}

/// Snapshot of a character at one end of an arc
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcState {
    /// Personality descriptors
    pub personality: Vec<String>,
    /// Motivation
    pub motivation: String,
    /// Emotion
    pub emotion: String,
}

/// Turning point on an arc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurningPoint {
    /// Chapter it lands in
    pub chapter: u32,
    /// Triggering event
    pub event: String,
    /// How the character changes
    pub change: String,
}

/// Arc plan for one character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcPlan {
    /// Arc shape
    pub arc_type: ArcType,
    /// Start state
    pub start_state: ArcState,
    /// End state
    pub end_state: ArcState,
    /// Turning points in conflict order
    pub turning_points: Vec<TurningPoint>,
    /// Progress 0-100
    pub current_progress: u8,
}

/// How deeply a chapter explores the theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeDepth {
    /// Touched on
    Surface,
    /// Argued
    Philosophical,
    /// Lived through
    Deep,
}

/// Theme expression in one chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeThreading {
    /// Chapter
    pub chapter: u32,
    /// Expression
    pub expression: String,
    /// Depth
    pub depth: ThemeDepth,
}

/// Recurring symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Name
    pub name: String,
    /// Meaning
    pub meaning: String,
    /// Chapters it appears in
    pub appearances: Vec<u32>,
}

/// Theme plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePlan {
    /// Core theme
    pub core_theme: String,
    /// Per-chapter threading
    pub threading: Vec<ThemeThreading>,
    /// Symbols
    pub symbols: Vec<Symbol>,
    /// Motifs
    pub motifs: Vec<String>,
}

/// Writer-facing result of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeBlueprint {
    /// Blueprint id
    pub id: String,
    /// World it was built from
    pub world_id: String,
    /// Evolution run it was built from
    pub evolution_id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Outline
    pub story_outline: StoryOutline,
    /// Chapter plans, numbered from 1
    pub chapter_plans: Vec<ChapterBlueprint>,
    /// Scenes in global sequence order
    pub scenes: Vec<SceneInstruction>,
    /// Arcs by character id
    pub character_arcs: BTreeMap<CharacterId, ArcPlan>,
    /// Theme plan
    pub theme_plan: ThemePlan,
}

impl NarrativeBlueprint {
    /// Scenes of `chapter`
    pub fn scenes_for(&self, chapter: u32) -> impl Iterator<Item = &SceneInstruction> {
        self.scenes.iter().filter(move |s| s.chapter == chapter)
    }
}

/// Assemble a blueprint from a finished run
///
/// `chapter_count` fixes the number of chapter plans; chapters missing from
/// the chapter plan are padded with generic entries.
pub async fn assemble_blueprint(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    config: &EvolutionConfig,
    chapter_count: u32,
) -> NarrativeBlueprint {
    let story_outline = build_outline(caller, state).await;
    let chapter_plans = build_chapter_plans(state, config, chapter_count);
    let scenes = build_scenes(caller, state, config, &chapter_plans).await;
    let character_arcs = build_arcs(caller, state, chapter_count).await;
    let theme_plan = build_theme_plan(caller, state, chapter_count).await;

    let blueprint = NarrativeBlueprint {
        id: format!("narrative_{}", ulid::Ulid::new()),
        world_id: state.world.id.clone(),
        evolution_id: state.id.clone(),
        created_at: Utc::now(),
        story_outline,
        chapter_plans,
        scenes,
        character_arcs,
        theme_plan,
    };
    state.log_action(
        "blueprint_assembled",
        json!({
            "id": blueprint.id,
            "chapters": blueprint.chapter_plans.len(),
            "scenes": blueprint.scenes.len(),
        }),
    );
    blueprint
}

fn first_names(state: &EvolutionState, n: usize) -> Vec<&str> {
    state.character_names().into_iter().take(n).collect()
}

fn setup(state: &EvolutionState) -> String {
    let mut setup = format!("In the world of {}, ", state.world.name);
    let names = first_names(state, 3);
    if !names.is_empty() {
        setup.push_str(&names.join(", "));
        setup.push_str(" each carry their own desires and secrets. ");
    }
    let question = &state.world.philosophy.core_question;
    if !question.is_empty() {
        setup.push_str("The world faces a fundamental question: ");
        setup.push_str(question);
    }
    setup.trim_end().to_string()
}

fn plot_point_one(state: &EvolutionState, conflict: &ConflictThread) -> String {
    if conflict.participants.is_empty() {
        return "the protagonist is drawn into the conflict and can no longer stand aside".to_string();
    }
    let names: Vec<&str> = conflict
        .participants
        .iter()
        .map(|p| state.character_name(p))
        .collect();
    format!(
        "{} are forced to act over {}, setting out on a path of change",
        names.join(" and "),
        conflict.core_question
    )
}

/// Outline used when there is no conflict to build from
#[must_use]
pub fn default_outline(setup: String) -> StoryOutline {
    StoryOutline {
        structure_type: StoryStructure::ThreeAct,
        act1: ActOne {
            setup,
            inciting_incident: "an event breaks the balance".to_string(),
            plot_point1: "the protagonist sets out".to_string(),
        },
        act2: ActTwo {
            rising_action: vec![
                "facing challenges".to_string(),
                "suffering setbacks".to_string(),
                "gaining growth".to_string(),
            ],
            midpoint: "a major turn of the story".to_string(),
            all_is_lost: "the protagonist reaches the lowest point".to_string(),
            plot_point2: "preparing for the final confrontation".to_string(),
        },
        act3: ActThree {
            climax: "the final confrontation".to_string(),
            resolution: "the conflict is resolved and the protagonist has grown".to_string(),
        },
    }
}

async fn build_outline(caller: &RetryingCaller, state: &mut EvolutionState) -> StoryOutline {
    let setup = setup(state);
    let Some(main) = find_main_conflict(&state.conflicts)
        .filter(|c| !c.evolution_path.is_empty())
        .cloned()
    else {
        return default_outline(setup);
    };
    let structure_type = select_structure(&state.conflicts);

    let path = &main.evolution_path;
    let midpoint_index = path.len() / 2;
    let rising_action = path
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, _)| *i != midpoint_index)
        .map(|(_, s)| s.description.clone())
        .collect();

    let act1 = ActOne {
        setup,
        inciting_incident: path[0].description.clone(),
        plot_point1: plot_point_one(state, &main),
    };
    let act2 = ActTwo {
        rising_action,
        midpoint: enrichment::story_beat(caller, state, StoryBeat::Midpoint, &main).await,
        all_is_lost: enrichment::story_beat(caller, state, StoryBeat::AllIsLost, &main).await,
        plot_point2: enrichment::story_beat(caller, state, StoryBeat::PlotPointTwo, &main).await,
    };
    let act3 = ActThree {
        climax: enrichment::story_beat(caller, state, StoryBeat::Climax, &main).await,
        resolution: enrichment::story_beat(caller, state, StoryBeat::Resolution, &main).await,
    };
    tracing::info!("outline built from {} ({:?})", main.id, structure_type);
    StoryOutline {
        structure_type,
        act1,
        act2,
        act3,
    }
}

fn padding_chapter(chapter: u32, word_count: u32) -> ChapterBlueprint {
    ChapterBlueprint {
        chapter,
        title: format!("Chapter {chapter}"),
        purpose: "this chapter advances the plot".to_string(),
        key_scenes: vec![
            "opening scene".to_string(),
            "development scene".to_string(),
            "turning scene".to_string(),
        ],
        plot_advancement: "the main plot moves forward".to_string(),
        arc_progress: "character arcs develop".to_string(),
        ending_hook: "leave a hook".to_string(),
        word_count,
        status: PlanStatus::Pending,
    }
}

fn build_chapter_plans(state: &EvolutionState, config: &EvolutionConfig, chapter_count: u32) -> Vec<ChapterBlueprint> {
    let default_words = config.story_length.default_chapter_words();
    let event_name = |id: &str| -> String {
        state
            .global_outline
            .as_ref()
            .and_then(|o| o.key_events.iter().find(|e| e.id == id))
            .map_or_else(|| id.to_string(), |e| e.name.clone())
    };

    (1..=chapter_count)
        .map(|n| {
            let words = state
                .chapter_outlines
                .get(&n)
                .map_or(default_words, |o| o.metrics.word_count);
            let Some(synopsis) = state.chapter_plan.as_ref().and_then(|p| p.chapter(n)) else {
                return padding_chapter(n, words);
            };
            let arc_progress = state
                .chapter_outlines
                .get(&n)
                .map(|o| {
                    o.character_evolution
                        .iter()
                        .map(|(id, c)| format!("{}: {}", state.character_name(id), c.emotional_arc))
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default();
            ChapterBlueprint {
                chapter: n,
                title: synopsis.title.clone(),
                purpose: synopsis.purpose.clone(),
                key_scenes: synopsis.key_events.iter().map(|id| event_name(id)).collect(),
                plot_advancement: synopsis.summary.clone(),
                arc_progress,
                ending_hook: synopsis.ending_hook.clone(),
                word_count: words,
                status: PlanStatus::Pending,
            }
        })
        .collect()
}

/// Scenes per chapter when no detail outline exists
#[inline]
#[must_use]
pub fn generated_scene_count(characters: usize) -> usize {
    3 + characters / 2
}

async fn build_scenes(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    config: &EvolutionConfig,
    plans: &[ChapterBlueprint],
) -> Vec<SceneInstruction> {
    let cast: Vec<CharacterId> = state.characters.keys().cloned().collect();
    let pov = state
        .relationship_network
        .center_node
        .clone()
        .or_else(|| cast.first().cloned())
        .unwrap_or_default();

    let mut scenes = Vec::new();
    let mut sequence = 0u32;
    for plan in plans {
        let chapter = plan.chapter;
        if let Some(outline) = state.chapter_outlines.get(&chapter) {
            let per_scene = outline
                .metrics
                .word_count
                .checked_div(outline.metrics.scene_count)
                .unwrap_or(EXPECTED_SCENE_LENGTH);
            for (i, detail) in outline.scenes.iter().enumerate() {
                sequence += 1;
                let mood = detail
                    .atmosphere
                    .split(',')
                    .next()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map_or_else(
                        || enrichment::scene_mood(&state.conflicts, config.tension_threshold, chapter, i).to_string(),
                        str::to_string,
                    );
                scenes.push(SceneInstruction {
                    chapter,
                    scene: u32::try_from(i + 1).unwrap_or(u32::MAX),
                    sequence,
                    purpose: detail.purpose.clone(),
                    location: detail.location.clone(),
                    characters: detail.characters.clone(),
                    pov_character: detail.pov.clone(),
                    action: detail.main_action.clone(),
                    dialogue_focus: detail.dialogue_focus.clone(),
                    expected_length: per_scene,
                    mood,
                    status: PlanStatus::Pending,
                });
            }
            continue;
        }

        for i in 0..generated_scene_count(cast.len()) {
            sequence += 1;
            let purpose = enrichment::scene_purpose(caller, state, chapter, i).await;
            let action = enrichment::scene_action(caller, state, chapter, i, &purpose).await;
            scenes.push(SceneInstruction {
                chapter,
                scene: u32::try_from(i + 1).unwrap_or(u32::MAX),
                sequence,
                purpose,
                location: enrichment::scene_location(&state.world, chapter, i),
                characters: cast.clone(),
                pov_character: pov.clone(),
                action,
                dialogue_focus: enrichment::dialogue_focus(&state.conflicts, chapter, i).to_string(),
                expected_length: EXPECTED_SCENE_LENGTH,
                mood: enrichment::scene_mood(&state.conflicts, config.tension_threshold, chapter, i)
                    .to_string(),
                status: PlanStatus::Pending,
            });
        }
    }
    tracing::info!("{} scene instructions over {} chapters", scenes.len(), plans.len());
    scenes
}

/// Growth when want and need differ, flat otherwise
#[must_use]
pub fn arc_type(character: &CharacterState) -> ArcType {
    if character.desires.conscious_want == character.desires.unconscious_need {
        ArcType::Flat
    } else {
        ArcType::Growth
    }
}

/// Chapter a stage lands in when `stages` stages spread over `chapters` chapters
#[must_use]
pub fn turning_point_chapter(stage: usize, stages: usize, chapters: u32) -> u32 {
    let chapters = chapters.max(1);
    let spread = stage * chapters as usize / stages.max(1);
    u32::try_from(spread + 1).unwrap_or(u32::MAX).min(chapters)
}

async fn build_arcs(
    caller: &RetryingCaller,
    state: &mut EvolutionState,
    chapter_count: u32,
) -> BTreeMap<CharacterId, ArcPlan> {
    let characters: Vec<CharacterState> = state.characters.values().cloned().collect();
    let conflicts = state.conflicts.clone();
    let mut arcs = BTreeMap::new();

    for c in characters {
        let mut turning_points = Vec::new();
        for conflict in conflicts
            .iter()
            .filter(|t| t.involves(&c.id) || t.involves(&c.name))
        {
            let stages = conflict.evolution_path.len();
            for (i, stage) in conflict.evolution_path.iter().enumerate() {
                let change = enrichment::character_change(caller, state, &c.id, &stage.description).await;
                turning_points.push(TurningPoint {
                    chapter: turning_point_chapter(i, stages, chapter_count),
                    event: stage.description.clone(),
                    change,
                });
            }
        }

        let progress = (c.arc_progress.clamp(0.0, 1.0) * 100.0).round() as u8;
        arcs.insert(
            c.id.clone(),
            ArcPlan {
                arc_type: arc_type(&c),
                start_state: ArcState {
                    personality: vec![c.emotions.current_emotion.clone()],
                    motivation: c.desires.conscious_want.clone(),
                    emotion: c.emotions.current_emotion.clone(),
                },
                end_state: ArcState {
                    personality: vec!["personality after growth".to_string()],
                    motivation: c.desires.unconscious_need.clone(),
                    emotion: crate::model::DEFAULT_EMOTION.to_string(),
                },
                turning_points,
                current_progress: progress,
            },
        );
    }
    arcs
}

/// Theme depth of `chapter` in a book of `chapters`
#[must_use]
pub fn theme_depth(chapter: u32, chapters: u32) -> ThemeDepth {
    if chapter > chapters / 2 {
        ThemeDepth::Deep
    } else if chapter > chapters / 4 {
        ThemeDepth::Philosophical
    } else {
        ThemeDepth::Surface
    }
}

/// Threading entries every fifth of the book
#[must_use]
pub fn theme_threading(theme: &str, chapters: u32) -> Vec<ThemeThreading> {
    let step = (chapters / 5).max(1) as usize;
    (1..=chapters)
        .step_by(step)
        .map(|chapter| ThemeThreading {
            chapter,
            expression: format!("chapter {chapter} explores {theme}"),
            depth: theme_depth(chapter, chapters),
        })
        .collect()
}

async fn build_theme_plan(caller: &RetryingCaller, state: &mut EvolutionState, chapter_count: u32) -> ThemePlan {
    let core_theme = state
        .architecture
        .as_ref()
        .map(|a| a.thematic_core.clone())
        .filter(|t| !t.trim().is_empty())
        .or_else(|| state.world.philosophy.themes.first().cloned())
        .unwrap_or_default();

    let symbols = enrichment::symbols(caller, state, &core_theme)
        .await
        .into_iter()
        .map(|(name, meaning)| Symbol {
            name,
            meaning,
            appearances: vec![1],
        })
        .collect();
    let motifs = enrichment::motifs(caller, state, &core_theme).await;

    ThemePlan {
        threading: theme_threading(&core_theme, chapter_count),
        core_theme,
        symbols,
        motifs,
    }
}
