//! Persistence contract and two stores
//!
//! Records are keyed by string id:
//! - blueprints, worlds and generated scenes, for downstream writers
//! - evolution checkpoints, so a restarted process can inspect the last
//!   completed phase
//!
//! [`MemoryStore`] keeps everything in concurrent maps. [`JsonFileStore`]
//! writes one pretty-printed JSON file per record.

use crate::blueprint::NarrativeBlueprint;
use crate::state::EvolutionState;
use crate::world::WorldSetting;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Narrative blueprint
    Blueprint,
    /// World setting
    World,
    /// Generated scene text
    Scene,
    /// Evolution state checkpoint
    Checkpoint,
}

impl RecordKind {
    /// Directory and display name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blueprint => "blueprints",
            Self::World => "worlds",
            Self::Scene => "scenes",
            Self::Checkpoint => "checkpoints",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with this id
    #[error("{kind} record {id:?} not found")]
    NotFound {
        /// Record kind
        kind: RecordKind,
        /// Requested id
        id: String,
    },

    /// Id cannot be used as a key
    #[error("invalid record id {0:?}")]
    InvalidId(String),

    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Generated prose for one scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneOutput {
    /// Record id
    pub id: String,
    /// Blueprint the scene belongs to
    pub blueprint_id: String,
    /// Chapter
    pub chapter: u32,
    /// Scene within the chapter
    pub scene: u32,
    /// Text
    pub content: String,
    /// Words in `content`
    pub word_count: u32,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl SceneOutput {
    /// Create a scene record; the id is derived from its position
    #[must_use]
    pub fn new(blueprint_id: impl Into<String>, chapter: u32, scene: u32, content: impl Into<String>) -> Self {
        let blueprint_id = blueprint_id.into();
        let content = content.into();
        Self {
            id: format!("{blueprint_id}_c{chapter}_s{scene}"),
            word_count: u32::try_from(content.split_whitespace().count()).unwrap_or(u32::MAX),
            blueprint_id,
            chapter,
            scene,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Key-value persistence for run outputs
#[async_trait]
pub trait NarrativeStore: Send + Sync {
    /// Save or replace a blueprint
    async fn save_blueprint(&self, blueprint: &NarrativeBlueprint) -> StoreResult<()>;
    /// Load a blueprint
    async fn get_blueprint(&self, id: &str) -> StoreResult<NarrativeBlueprint>;
    /// Save or replace a world
    async fn save_world(&self, world: &WorldSetting) -> StoreResult<()>;
    /// Load a world
    async fn get_world(&self, id: &str) -> StoreResult<WorldSetting>;
    /// Save or replace a scene
    async fn save_scene(&self, scene: &SceneOutput) -> StoreResult<()>;
    /// Load a scene
    async fn get_scene(&self, id: &str) -> StoreResult<SceneOutput>;
    /// Scenes of a blueprint ordered by chapter and scene
    async fn list_scenes(&self, blueprint_id: &str) -> StoreResult<Vec<SceneOutput>>;
    /// Save or replace the checkpoint of a run
    async fn save_checkpoint(&self, state: &EvolutionState) -> StoreResult<()>;
    /// Load the checkpoint of a run
    async fn get_checkpoint(&self, id: &str) -> StoreResult<EvolutionState>;
}

fn not_found(kind: RecordKind, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn sort_scenes(scenes: &mut [SceneOutput]) {
    scenes.sort_by_key(|s| (s.chapter, s.scene));
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    blueprints: DashMap<String, NarrativeBlueprint>,
    worlds: DashMap<String, WorldSetting>,
    scenes: DashMap<String, SceneOutput>,
    checkpoints: DashMap<String, EvolutionState>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored checkpoints
    #[must_use]
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }
}

#[async_trait]
impl NarrativeStore for MemoryStore {
    async fn save_blueprint(&self, blueprint: &NarrativeBlueprint) -> StoreResult<()> {
        self.blueprints.insert(blueprint.id.clone(), blueprint.clone());
        Ok(())
    }

    async fn get_blueprint(&self, id: &str) -> StoreResult<NarrativeBlueprint> {
        self.blueprints
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| not_found(RecordKind::Blueprint, id))
    }

    async fn save_world(&self, world: &WorldSetting) -> StoreResult<()> {
        self.worlds.insert(world.id.clone(), world.clone());
        Ok(())
    }

    async fn get_world(&self, id: &str) -> StoreResult<WorldSetting> {
        self.worlds
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| not_found(RecordKind::World, id))
    }

    async fn save_scene(&self, scene: &SceneOutput) -> StoreResult<()> {
        self.scenes.insert(scene.id.clone(), scene.clone());
        Ok(())
    }

    async fn get_scene(&self, id: &str) -> StoreResult<SceneOutput> {
        self.scenes
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| not_found(RecordKind::Scene, id))
    }

    async fn list_scenes(&self, blueprint_id: &str) -> StoreResult<Vec<SceneOutput>> {
        let mut scenes: Vec<SceneOutput> = self
            .scenes
            .iter()
            .filter(|r| r.value().blueprint_id == blueprint_id)
            .map(|r| r.value().clone())
            .collect();
        sort_scenes(&mut scenes);
        Ok(scenes)
    }

    async fn save_checkpoint(&self, state: &EvolutionState) -> StoreResult<()> {
        self.checkpoints.insert(state.id.clone(), state.clone());
        Ok(())
    }

    async fn get_checkpoint(&self, id: &str) -> StoreResult<EvolutionState> {
        self.checkpoints
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| not_found(RecordKind::Checkpoint, id))
    }
}

/// One JSON file per record under `root/<kind>/<id>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `root`; directories are created on first write
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, kind: RecordKind, id: &str) -> StoreResult<PathBuf> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(kind.as_str()).join(format!("{id}.json")))
    }

    async fn write<T: Serialize + Sync>(&self, kind: RecordKind, id: &str, value: &T) -> StoreResult<()> {
        let path = self.path(kind, id)?;
        let dir = self.root.join(kind.as_str());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io { path: dir, source })?;

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        tracing::debug!("stored {} {}", kind, path.display());
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, kind: RecordKind, id: &str) -> StoreResult<T> {
        let path = self.path(kind, id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(kind, id)),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[async_trait]
impl NarrativeStore for JsonFileStore {
    async fn save_blueprint(&self, blueprint: &NarrativeBlueprint) -> StoreResult<()> {
        self.write(RecordKind::Blueprint, &blueprint.id, blueprint).await
    }

    async fn get_blueprint(&self, id: &str) -> StoreResult<NarrativeBlueprint> {
        self.read(RecordKind::Blueprint, id).await
    }

    async fn save_world(&self, world: &WorldSetting) -> StoreResult<()> {
        self.write(RecordKind::World, &world.id, world).await
    }

    async fn get_world(&self, id: &str) -> StoreResult<WorldSetting> {
        self.read(RecordKind::World, id).await
    }

    async fn save_scene(&self, scene: &SceneOutput) -> StoreResult<()> {
        self.write(RecordKind::Scene, &scene.id, scene).await
    }

    async fn get_scene(&self, id: &str) -> StoreResult<SceneOutput> {
        self.read(RecordKind::Scene, id).await
    }

    async fn list_scenes(&self, blueprint_id: &str) -> StoreResult<Vec<SceneOutput>> {
        let dir = self.root.join(RecordKind::Scene.as_str());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut scenes = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| StoreError::Io { path: dir.clone(), source })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| StoreError::Io { path: path.clone(), source })?;
            let scene: SceneOutput = serde_json::from_slice(&bytes)?;
            if scene.blueprint_id == blueprint_id {
                scenes.push(scene);
            }
        }
        sort_scenes(&mut scenes);
        Ok(scenes)
    }

    async fn save_checkpoint(&self, state: &EvolutionState) -> StoreResult<()> {
        self.write(RecordKind::Checkpoint, &state.id, state).await
    }

    async fn get_checkpoint(&self, id: &str) -> StoreResult<EvolutionState> {
        self.read(RecordKind::Checkpoint, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn world() -> WorldSetting {
        WorldSetting::new("world_1", "Saltmarsh")
    }

    #[tokio::test]
    async fn memory_store_round_trips_worlds() {
        let store = MemoryStore::new();
        store.save_world(&world()).await.unwrap();
        assert_eq!(store.get_world("world_1").await.unwrap().name, "Saltmarsh");
        assert!(matches!(
            store.get_world("nope").await,
            Err(StoreError::NotFound { kind: RecordKind::World, .. })
        ));
    }

    #[tokio::test]
    async fn scenes_are_listed_in_order() {
        let store = MemoryStore::new();
        for (chapter, scene) in [(2, 1), (1, 2), (1, 1)] {
            store
                .save_scene(&SceneOutput::new("bp", chapter, scene, "text"))
                .await
                .unwrap();
        }
        store.save_scene(&SceneOutput::new("other", 1, 1, "x")).await.unwrap();

        let listed = store.list_scenes("bp").await.unwrap();
        let order: Vec<(u32, u32)> = listed.iter().map(|s| (s.chapter, s.scene)).collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[tokio::test]
    async fn file_store_round_trips_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let state = EvolutionState::new(Arc::new(world()), 10);

        store.save_checkpoint(&state).await.unwrap();
        let back = store.get_checkpoint(&state.id).await.unwrap();
        assert_eq!(back.id, state.id);
        assert_eq!(back.world.name, "Saltmarsh");
        assert!(dir.path().join("checkpoints").join(format!("{}.json", state.id)).exists());
    }

    #[tokio::test]
    async fn file_store_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(
            store.get_blueprint("missing").await,
            Err(StoreError::NotFound { kind: RecordKind::Blueprint, .. })
        ));
        assert!(store.list_scenes("bp").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn path_traversal_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut w = world();
        w.id = "../escape".into();
        assert!(matches!(store.save_world(&w).await, Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn scene_word_count_counts_whitespace_words() {
        let scene = SceneOutput::new("bp", 1, 2, "the bell cracked at dawn");
        assert_eq!(scene.word_count, 5);
        assert_eq!(scene.id, "bp_c1_s2");
    }
}
