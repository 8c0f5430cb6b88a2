//! Reader configuration.

use crate::flags::StaticFlags;
use crate::interface::DEFAULT_SHARE_BASE_URL;
use crate::storyteller::{GeneratorError, GroqGenerator};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default directory for progress and logs.
pub const DEFAULT_DATA_DIR: &str = ".storyteller";

const PROGRESS_FILE: &str = "progress.json";
const LOG_FILE: &str = "storyteller.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is set but empty")]
    Empty { var: &'static str },

    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidUrl { var: &'static str, value: String },
}

/// Configuration for a reader session.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Where progress and logs are written.
    pub data_dir: PathBuf,

    /// Extra story catalog (JSON) loaded on top of the built-in stories.
    pub catalog_path: Option<PathBuf>,

    /// Flags enabled locally, as a comma-separated list.
    pub enabled_flags: String,

    /// Flagsmith environment key; overrides `enabled_flags` when set.
    pub flagsmith_environment: Option<String>,

    pub groq_api_key: Option<String>,

    /// Model for the AI storyteller.
    pub groq_model: Option<String>,

    pub share_base_url: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            catalog_path: None,
            enabled_flags: String::new(),
            flagsmith_environment: None,
            groq_api_key: None,
            groq_model: None,
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Some(dir) = lookup("STORYTELLER_DATA_DIR") {
            if dir.trim().is_empty() {
                return Err(ConfigError::Empty {
                    var: "STORYTELLER_DATA_DIR",
                });
            }
            config = config.with_data_dir(dir.trim());
        }
        if let Some(path) = lookup("STORYTELLER_CATALOG").filter(|p| !p.trim().is_empty()) {
            config = config.with_catalog_path(path.trim());
        }
        if let Some(flags) = lookup("STORYTELLER_FLAGS") {
            config = config.with_flags(flags);
        }
        if let Some(env_id) = lookup("FLAGSMITH_ENVIRONMENT_ID")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "Not configured")
        {
            config = config.with_flagsmith_environment(env_id);
        }
        if let Some(key) = lookup("GROQ_API_KEY").filter(|k| !k.trim().is_empty()) {
            config = config.with_groq_api_key(key.trim());
        }
        if let Some(model) = lookup("GROQ_MODEL").filter(|m| !m.trim().is_empty()) {
            config = config.with_groq_model(model.trim());
        }
        if let Some(url) = lookup("STORYTELLER_SHARE_URL") {
            let url = url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    var: "STORYTELLER_SHARE_URL",
                    value: url.to_string(),
                });
            }
            config = config.with_share_base_url(url);
        }

        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Set the locally enabled flags (`"a,b,name=value"`).
    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.enabled_flags = flags.into();
        self
    }

    pub fn with_flagsmith_environment(mut self, env_id: impl Into<String>) -> Self {
        self.flagsmith_environment = Some(env_id.into());
        self
    }

    pub fn with_groq_api_key(mut self, key: impl Into<String>) -> Self {
        self.groq_api_key = Some(key.into());
        self
    }

    pub fn with_groq_model(mut self, model: impl Into<String>) -> Self {
        self.groq_model = Some(model.into());
        self
    }

    pub fn with_share_base_url(mut self, url: impl Into<String>) -> Self {
        self.share_base_url = url.into();
        self
    }

    /// File holding saved progress.
    pub fn progress_path(&self) -> PathBuf {
        self.data_dir.join(PROGRESS_FILE)
    }

    /// File the terminal UI logs to.
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Flags from `enabled_flags`.
    pub fn static_flags(&self) -> StaticFlags {
        StaticFlags::from_list(&self.enabled_flags)
    }

    /// The configured Groq generator.
    pub fn generator(&self) -> Result<GroqGenerator, GeneratorError> {
        let key = self
            .groq_api_key
            .as_deref()
            .ok_or_else(|| GeneratorError::NotConfigured("GROQ_API_KEY is not set".to_string()))?;

        let mut client = groq::Groq::new(key);
        if let Some(model) = &self.groq_model {
            client = client.with_model(model);
        }
        Ok(GroqGenerator::new(client))
    }

    /// A flagsmith client, when an environment key is configured.
    pub fn flagsmith(&self) -> Option<flagsmith::Flagsmith> {
        self.flagsmith_environment
            .as_deref()
            .map(flagsmith::Flagsmith::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{FlagProvider, FIRST_PERSON_NARRATIVE};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.share_base_url, DEFAULT_SHARE_BASE_URL);
        assert!(config.static_flags().is_empty());
        assert!(config.flagsmith().is_none());
        assert!(config.generator().is_err());
        assert_eq!(config.progress_path(), PathBuf::from(".storyteller/progress.json"));
    }

    #[test]
    fn test_from_lookup() {
        let config = ReaderConfig::from_lookup(lookup(&[
            ("STORYTELLER_DATA_DIR", "/tmp/reader"),
            ("STORYTELLER_FLAGS", "use_first_person_narrative"),
            ("FLAGSMITH_ENVIRONMENT_ID", "env-123"),
            ("GROQ_API_KEY", "gsk-test"),
            ("GROQ_MODEL", "llama3-8b-8192"),
            ("STORYTELLER_SHARE_URL", "http://localhost:8080"),
        ]))
        .unwrap();

        assert_eq!(config.log_path(), PathBuf::from("/tmp/reader/storyteller.log"));
        assert!(config.static_flags().has_feature(FIRST_PERSON_NARRATIVE).unwrap());
        assert!(config.flagsmith().is_some());
        assert_eq!(config.generator().unwrap().model(), "llama3-8b-8192");
        assert_eq!(config.share_base_url, "http://localhost:8080");
    }

    #[test]
    fn test_placeholder_flagsmith_key_ignored() {
        let config =
            ReaderConfig::from_lookup(lookup(&[("FLAGSMITH_ENVIRONMENT_ID", "Not configured")]))
                .unwrap();
        assert!(config.flagsmith_environment.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let err = ReaderConfig::from_lookup(lookup(&[("STORYTELLER_DATA_DIR", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Empty { .. }));

        let err = ReaderConfig::from_lookup(lookup(&[("STORYTELLER_SHARE_URL", "storyteller.app")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_builder() {
        let config = ReaderConfig::new()
            .with_data_dir("saves")
            .with_catalog_path("extra.json")
            .with_flags("enable_story_sharing");
        assert_eq!(config.data_dir(), Path::new("saves"));
        assert_eq!(config.catalog_path.as_deref(), Some(Path::new("extra.json")));
    }
}
