//! Orchestrator configuration

use serde::{Deserialize, Serialize};

/// Requested story length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryLength {
    /// Novella
    Short,
    /// Novel
    #[default]
    Medium,
    /// Serial
    Long,
}

impl StoryLength {
    /// Default chapter count for this length
    #[inline]
    #[must_use]
    pub fn default_chapter_count(self) -> u32 {
        match self {
            Self::Short => 10,
            Self::Medium => 20,
            Self::Long => 40,
        }
    }

    /// Default words per chapter for this length
    #[inline]
    #[must_use]
    pub fn default_chapter_words(self) -> u32 {
        match self {
            Self::Short => 3000,
            Self::Medium => 5000,
            Self::Long => 8000,
        }
    }
}

/// Evolution orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Soft cap on rounds; exceeding it only logs a warning
    pub max_rounds: u32,
    /// Base word count of a chapter before scenes are counted
    pub base_chapter_words: u32,
    /// Words added per scene
    pub words_per_scene: u32,
    /// Story length, used when no chapter count is given
    pub story_length: StoryLength,
    /// Persist a checkpoint after every completed phase when a store is attached
    pub checkpoint_after_each_phase: bool,
    /// Conflict intensity (0-10) above which unresolved conflicts force a tense mood
    pub tension_threshold: u8,
}

impl EvolutionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With soft round cap
    #[inline]
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// With story length
    #[inline]
    #[must_use]
    pub fn with_story_length(mut self, length: StoryLength) -> Self {
        self.story_length = length;
        self
    }

    /// With per-phase checkpointing
    #[inline]
    #[must_use]
    pub fn with_checkpoints(mut self, enabled: bool) -> Self {
        self.checkpoint_after_each_phase = enabled;
        self
    }

    /// With tension threshold
    #[inline]
    #[must_use]
    pub fn with_tension_threshold(mut self, threshold: u8) -> Self {
        self.tension_threshold = threshold;
        self
    }

    /// Chapter count for a run, falling back to the story length default
    #[inline]
    #[must_use]
    pub fn chapter_count(&self, requested: Option<u32>) -> u32 {
        requested
            .filter(|n| *n > 0)
            .unwrap_or_else(|| self.story_length.default_chapter_count())
    }

    /// With base chapter words
    #[inline]
    #[must_use]
    pub fn with_base_chapter_words(mut self, words: u32) -> Self {
        self.base_chapter_words = words;
        self
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            max_rounds: 500,
            base_chapter_words: 3000,
            words_per_scene: 500,
            story_length: StoryLength::Medium,
            checkpoint_after_each_phase: true,
            tension_threshold: 8,
        }
    }
}
