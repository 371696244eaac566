//! Testing utilities for Saga workspace
//!
//! Scripted generation port, fixture world and canned per-role responses.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use saga_core::{EvolutionConfig, EvolutionOrchestrator, WorldSetting};
use saga_generation::{
    GenerationConfig, GenerationPort, GenerationRequest, PromptRole, RetryPolicy, RetryingCaller,
    TransportError,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One scripted answer
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(TransportError),
}

impl Reply {
    pub fn json(value: &Value) -> Self {
        Self::Text(value.to_string())
    }
}

/// Generation port answering from per-role scripts
///
/// Queued replies are consumed first; once a role's queue is empty its
/// default answers every call. A role with neither is unavailable.
#[derive(Debug, Default)]
pub struct ScriptedPort {
    queued: Mutex<HashMap<PromptRole, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<PromptRole, Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_default(self, role: PromptRole, reply: Reply) -> Self {
        self.set_default(role, reply);
        self
    }

    pub fn set_default(&self, role: PromptRole, reply: Reply) {
        self.defaults.lock().insert(role, reply);
    }

    pub fn push(&self, role: PromptRole, reply: Reply) {
        self.queued.lock().entry(role).or_default().push_back(reply);
    }

    pub fn push_text(&self, role: PromptRole, text: impl Into<String>) {
        self.push(role, Reply::Text(text.into()));
    }

    /// Every call for `role` fails from now on
    pub fn fail_always(&self, role: PromptRole) {
        self.queued.lock().remove(&role);
        self.set_default(
            role,
            Reply::Fail(TransportError::Unavailable(format!("{role} scripted to fail"))),
        );
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn calls_for(&self, role: PromptRole) -> usize {
        self.requests.lock().iter().filter(|r| r.role == role).count()
    }
}

#[async_trait]
impl GenerationPort for ScriptedPort {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, TransportError> {
        self.requests.lock().push(request.clone());
        let queued = self
            .queued
            .lock()
            .get_mut(&request.role)
            .and_then(VecDeque::pop_front);
        let reply = queued.or_else(|| self.defaults.lock().get(&request.role).cloned());
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(e)) => Err(e),
            None => Err(TransportError::Unavailable(format!(
                "no script for {}",
                request.role
            ))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub const CHARACTER_NAMES: [&str; 6] = [
    "Iva Marr",
    "Teodor Kell",
    "Sabine Orro",
    "Pell Dasko",
    "Ines Vane",
    "Ruko Stahl",
];

pub fn fixture_world() -> WorldSetting {
    serde_json::from_value(json!({
        "id": "world_saltmarsh",
        "name": "Saltmarsh",
        "type": "fantasy",
        "scale": "nation",
        "style": "low fantasy, grounded",
        "philosophy": {
            "core_question": "What is owed to those who keep the sea out?",
            "themes": ["duty", "inheritance"],
            "values": ["loyalty", "craft"]
        },
        "geography": {
            "regions": [
                {"id": "r0", "name": "The Dykes", "type": "wetland", "description": "Earthworks holding back the tide"},
                {"id": "r1", "name": "Kestrel Keep", "type": "fortress", "description": "Seat of the crown"}
            ]
        },
        "civilization": {
            "races": [{"id": "human", "name": "Marshfolk", "description": "Dyke builders", "traits": ["stubborn"]}]
        },
        "society": {
            "politics": "a crown that taxes the dyke guilds",
            "classes": ["guildsmen", "nobles"],
            "conflicts": [{"name": "the levy", "type": "political", "description": "guilds refuse the tax", "parties": ["guilds", "crown"]}]
        },
        "story_soil": {
            "tensions": ["the dykes are failing"],
            "plot_hooks": ["a forged charter"]
        }
    }))
    .unwrap()
}

pub fn character_id(index: usize) -> String {
    format!("char_{index}")
}

pub fn character_basic(index: usize) -> Value {
    let role = match index {
        0 => "protagonist",
        1 => "antagonist",
        _ => "supporting",
    };
    let base = CHARACTER_NAMES[index % CHARACTER_NAMES.len()];
    let name = if index < CHARACTER_NAMES.len() {
        base.to_string()
    } else {
        format!("{base} {index}")
    };
    json!({
        "name": name,
        "role": role,
        "age": "34",
        "background": "raised on the dykes",
        "personality": ["stubborn", "dry"],
        "conscious_want": "keep the guild's charter",
        "unconscious_need": "forgive her father",
        "core_traits": ["loyal"],
        "flaws": ["proud"]
    })
}

pub fn character_depth() -> Value {
    json!({
        "internal_conflicts": ["duty against grief"],
        "secrets": ["she signed the forged charter"],
        "fears": ["drowning", "being forgotten"],
        "triggers": ["bells at night"],
        "masking_behaviors": ["jokes"],
        "want_vs_need_gap": "wants the charter, needs to let it go"
    })
}

pub fn roster(total: u32) -> Value {
    json!({
        "total_characters": total,
        "protagonist_count": 1,
        "antagonist_count": 1,
        "supporting_count": total.saturating_sub(2),
        "network_structure": "star"
    })
}

/// Star network centred on the first character
pub fn star_network(total: usize) -> Value {
    let edges: Vec<Value> = (1..total)
        .map(|i| {
            json!({
                "char_a": character_id(0),
                "char_b": character_id(i),
                "relation_type": if i == 1 { "rival" } else { "ally" },
                "tension": if i == 1 { 8 } else { 3 },
                "description": "bound by the dykes",
                "power_dynamic": "uneven",
                "shared_history": ["the flood year"],
                "unspoken_tension": ["the charter"]
            })
        })
        .collect();
    json!({ "relationships": edges })
}

pub fn foreshadow_plan() -> Value {
    let plan = [(1, 3), (1, 4), (2, 4), (2, 5), (3, 5)];
    let items: Vec<Value> = plan
        .iter()
        .enumerate()
        .map(|(i, (plant, payoff))| {
            json!({
                "id": format!("foreshadow_{i}"),
                "type": "object",
                "content": format!("hint {i}"),
                "plant_chapter": plant,
                "plant_scene": 1,
                "payoff_chapter": payoff,
                "payoff_scene": 2,
                "importance": "major"
            })
        })
        .collect();
    json!({ "foreshadows": items })
}

pub fn conflict_design() -> Value {
    json!({
        "type": "interpersonal",
        "core_question": "Who owns the dykes?",
        "participants": [character_id(0), character_id(1)],
        "stakes": "the harbour floods",
        "current_intensity": 6
    })
}

pub fn conflict_evolution() -> Value {
    json!({
        "stages": [
            {"stage": "spark", "description": "the levy is announced", "events": ["levy"], "intensity": 4},
            {"stage": "escalation", "description": "the guilds strike", "events": ["strike"], "intensity": 7},
            {"stage": "break", "description": "the dyke is cut", "events": ["breach"], "intensity": 9}
        ]
    })
}

pub fn key_events() -> Value {
    json!({
        "events": [
            {"id": "event_0", "name": "The levy", "description": "the crown taxes the guilds", "characters": [character_id(0)], "consequences": ["strike"]},
            {"id": "event_1", "name": "The strike", "description": "work on the dykes stops", "characters": [character_id(0), character_id(1)], "consequences": ["breach"]},
            {"id": "event_2", "name": "The breach", "description": "the sea comes in", "characters": [character_id(1)], "consequences": []}
        ]
    })
}

pub fn chapter_assignment(chapters: u32) -> Value {
    let items: Vec<Value> = (1..=chapters)
        .map(|n| {
            json!({
                "chapter": n,
                "title": format!("Tide {n}"),
                "summary": format!("the water rises, part {n}"),
                "purpose": "raise the stakes",
                "key_events": [format!("event_{}", (n - 1) % 3)],
                "ending_hook": "a bell rings"
            })
        })
        .collect();
    json!({ "chapters": items })
}

pub fn scene_sequence(scenes: u32) -> Value {
    let items: Vec<Value> = (1..=scenes)
        .map(|n| json!({"sequence": n, "type": "dialogue", "purpose": format!("beat {n}")}))
        .collect();
    json!({ "scenes": items })
}

pub fn scene_detail() -> Value {
    json!({
        "location": "The Dykes",
        "time": "dusk",
        "pov_character": character_id(0),
        "characters": [character_id(0), character_id(1)],
        "main_action": "they argue over the charter",
        "dialogue_focus": "who owes whom",
        "character_changes": {
            "char_0": {"emotional_change": "anger to doubt", "new_knowledge": ["the charter is forged"], "internal_conflict": "duty against kin"}
        },
        "relationship_changes": [{"relationship": "char_0_char_1", "change": "trust breaks", "new_tension": 9}],
        "foreshadow_plant": [{"foreshadow_id": "foreshadow_0", "method": "object"}],
        "foreshadow_payoff": [],
        "constraints": {"must_include": ["the charter"], "must_not_reveal": ["the forger"], "transition_hint": "cut to the keep"},
        "atmosphere": {"mood": "tense", "pacing": "fast", "sensory_focus": ["salt", "wind"]}
    })
}

pub fn character_evolution() -> Value {
    json!({
        "evolutions": [{
            "character_id": character_id(0),
            "emotional_arc": ["anger", "doubt"],
            "growth_summary": "she starts to question the guild",
            "relationship_changes": {"char_1": "open hostility"},
            "turning_point": "refuses the guild's order"
        }]
    })
}

/// Port answering every role with a well-formed response
///
/// Characters are queued individually so each gets a distinct name; the
/// default for the creator role repeats the first one.
pub fn canned_port(characters: u32, chapters: u32) -> ScriptedPort {
    let port = ScriptedPort::new()
        .with_default(
            PromptRole::StoryArchitectureAnalyzer,
            Reply::json(&json!({
                "core_tensions": ["guilds against crown"],
                "story_potential": ["a succession crisis"],
                "complexity": "medium",
                "suggested_modes": ["ensemble drama"]
            })),
        )
        .with_default(
            PromptRole::NarrativeModeSelector,
            Reply::json(&json!({"selected_mode": "ensemble drama", "reasoning": "many factions"})),
        )
        .with_default(PromptRole::CharacterRosterPlanner, Reply::json(&roster(characters)))
        .with_default(
            PromptRole::ConflictArchitect,
            Reply::json(&json!({
                "primary_conflicts": ["guilds against crown"],
                "secondary_conflicts": ["sisters divided"],
                "thematic_core": "what is owed",
                "conflict_direction": "the guilds rise",
                "refined_direction": "the guilds rise, and split",
                "conflict_layers": ["public", "private"]
            })),
        )
        .with_default(PromptRole::CharacterCreator, Reply::json(&character_basic(0)))
        .with_default(PromptRole::CharacterPsychologist, Reply::json(&character_depth()))
        .with_default(
            PromptRole::RelationshipArchitect,
            Reply::json(&star_network(characters as usize)),
        )
        .with_default(
            PromptRole::RelationshipEvolutionist,
            Reply::json(&json!({"evolutions": []})),
        )
        .with_default(PromptRole::ForeshadowArchitect, Reply::json(&foreshadow_plan()))
        .with_default(
            PromptRole::ForeshadowValidator,
            Reply::json(&json!({"is_valid": true, "issues": [], "suggestions": [], "missing_payoffs": []})),
        )
        .with_default(PromptRole::ConflictDesigner, Reply::json(&conflict_design()))
        .with_default(PromptRole::ConflictEvolutionist, Reply::json(&conflict_evolution()))
        .with_default(
            PromptRole::ConflictHierarchist,
            Reply::json(&json!({"primary_conflicts": ["conflict_0"], "relationships": "the levy drives all"})),
        )
        .with_default(
            PromptRole::StoryArchitect,
            Reply::json(&json!({"opening": "a bell in the fog", "direction": "toward the breach", "themes": ["duty"]})),
        )
        .with_default(PromptRole::PlotDesigner, Reply::json(&key_events()))
        .with_default(
            PromptRole::ClimaxDesigner,
            Reply::json(&json!({"climax": "the dyke is cut", "resolution": "the guilds rebuild"})),
        )
        .with_default(PromptRole::ChapterPlanner, Reply::json(&chapter_assignment(chapters)))
        .with_default(
            PromptRole::ChapterRefiner,
            Reply::json(&json!({"transitions": ["soften chapter 2"], "pacing": [], "improvements": []})),
        )
        .with_default(PromptRole::SceneSequenceDesigner, Reply::json(&scene_sequence(3)))
        .with_default(PromptRole::SceneDetailDesigner, Reply::json(&scene_detail()))
        .with_default(
            PromptRole::CharacterEvolutionTracker,
            Reply::json(&character_evolution()),
        )
        .with_default(
            PromptRole::StructureDesigner,
            Reply::Text("the tide turns against the guild".into()),
        )
        .with_default(
            PromptRole::ThemeDesigner,
            Reply::json(&json!({
                "symbols": [{"name": "the bell", "meaning": "warning ignored"}],
                "motifs": ["rising water"]
            })),
        )
        .with_default(PromptRole::SceneDesigner, Reply::Text("show the cost of the levy".into()))
        .with_default(PromptRole::ArcDesigner, Reply::Text("she stops trusting the charter".into()));

    for i in 0..characters as usize {
        port.push(PromptRole::CharacterCreator, Reply::json(&character_basic(i)));
    }
    port
}

/// Generation config that retries three times without sleeping
pub fn fast_generation_config() -> GenerationConfig {
    GenerationConfig::new().with_retry(RetryPolicy::immediate(3))
}

pub fn scripted_orchestrator(port: Arc<ScriptedPort>) -> EvolutionOrchestrator {
    scripted_orchestrator_with(port, EvolutionConfig::new())
}

pub fn scripted_orchestrator_with(port: Arc<ScriptedPort>, config: EvolutionConfig) -> EvolutionOrchestrator {
    let caller = RetryingCaller::new(port, fast_generation_config());
    EvolutionOrchestrator::new(caller, config)
}
