//! Generation configuration
//!
//! Loaded once (YAML or TOML) and passed by reference. Nothing in the
//! workspace reads configuration from globals.

use crate::retry::RetryPolicy;
use crate::role::{PromptRole, Sampling};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax or shape error
    #[error("invalid yaml config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML syntax or shape error
    #[error("invalid toml config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Unsupported file extension
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Semantically invalid values
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One OpenAI-compatible provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Literal API key; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: String,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Model name
    pub model: String,
}

impl ProviderConfig {
    /// Resolve the API key from the literal value or the environment
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Request timeouts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-attempt request timeout in seconds
    pub llm_request: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { llm_request: 120 }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging settings consumed by binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Top-level generation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Provider used when none is named
    pub default_provider: Option<String>,
    /// Named providers
    pub providers: BTreeMap<String, ProviderConfig>,
    /// Per-role sampling overrides
    pub module_mapping: BTreeMap<PromptRole, Sampling>,
    /// Retry policy
    pub retry: RetryPolicy,
    /// Timeouts
    pub timeout: TimeoutConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl GenerationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With per-attempt timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.timeout.llm_request = secs;
        self
    }

    /// With a sampling override for `role`
    #[inline]
    #[must_use]
    pub fn with_sampling(mut self, role: PromptRole, sampling: Sampling) -> Self {
        self.module_mapping.insert(role, sampling);
        self
    }

    /// With a named provider
    #[inline]
    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>, provider: ProviderConfig) -> Self {
        let name = name.into();
        if self.default_provider.is_none() {
            self.default_provider = Some(name.clone());
        }
        self.providers.insert(name, provider);
        self
    }

    /// Sampling for `role`, falling back to the role's built-in defaults
    #[must_use]
    pub fn sampling_for(&self, role: PromptRole) -> Sampling {
        self.module_mapping
            .get(&role)
            .map_or_else(|| role.default_sampling(), |s| Sampling::new(s.temperature, s.max_tokens))
    }

    /// Per-attempt timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.llm_request)
    }

    /// Provider named `name`, or the default provider
    #[must_use]
    pub fn provider(&self, name: Option<&str>) -> Option<&ProviderConfig> {
        let name = name.or(self.default_provider.as_deref())?;
        self.providers.get(name)
    }

    /// Parse YAML text
    ///
    /// # Errors
    /// Fails on malformed YAML or invalid values.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Fails on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`, `.yml` or `.toml` file
    ///
    /// # Errors
    /// Fails when the file cannot be read, has an unknown extension, or
    /// does not parse.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            Some("toml") => Self::from_toml_str(&text),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Check cross-field invariants
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.timeout.llm_request == 0 {
            return Err(ConfigError::Invalid("timeout.llm_request must be positive".into()));
        }
        if let Some(name) = &self.default_provider {
            if !self.providers.contains_key(name) {
                return Err(ConfigError::Invalid(format!(
                    "default_provider '{name}' is not defined"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r"
default_provider: local
providers:
  local:
    base_url: http://localhost:8080/v1
    api_key_env: SAGA_TEST_KEY_UNSET
    model: story-large
module_mapping:
  character_creator:
    temperature: 0.9
    max_tokens: 1200
retry:
  max_attempts: 4
  initial_delay: 1
  max_delay: 3
timeout:
  llm_request: 30
logging:
  level: debug
  format: json
";

    #[test]
    fn yaml_round_trip_of_known_fields() {
        let config = GenerationConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.sampling_for(PromptRole::CharacterCreator).max_tokens, 1200);
        assert_eq!(
            config.sampling_for(PromptRole::PlotDesigner),
            PromptRole::PlotDesigner.default_sampling()
        );
        assert_eq!(config.provider(None).unwrap().model, "story-large");
    }

    #[test]
    fn unknown_role_in_module_mapping_is_rejected() {
        let text = "module_mapping:\n  poet:\n    temperature: 1.0\n    max_tokens: 10\n";
        assert!(matches!(
            GenerationConfig::from_yaml_str(text),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let text = "retry:\n  max_attempts: 0\n  initial_delay: 1\n  max_delay: 1\n";
        assert!(matches!(
            GenerationConfig::from_yaml_str(text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_default_provider_is_invalid() {
        let text = "default_provider: nowhere\n";
        assert!(GenerationConfig::from_yaml_str(text).is_err());
    }

    #[test]
    fn api_key_prefers_literal() {
        let provider = ProviderConfig {
            base_url: "http://x".into(),
            api_key: "sk-literal".into(),
            api_key_env: Some("SAGA_TEST_KEY_UNSET".into()),
            model: "m".into(),
        };
        assert_eq!(provider.resolve_api_key().as_deref(), Some("sk-literal"));

        let provider = ProviderConfig {
            api_key: String::new(),
            ..provider
        };
        assert_eq!(provider.resolve_api_key(), None);
    }

    #[test]
    fn loads_toml_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[retry]\nmax_attempts = 2\ninitial_delay = 0\nmax_delay = 0").unwrap();
        let config = GenerationConfig::from_path(file.path()).unwrap();
        assert_eq!(config.retry.max_attempts, 2);

        let other = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            GenerationConfig::from_path(other.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
