//! Feature-flag lookups and per-session feature resolution.
//!
//! The flag provider is an external collaborator. The reader polls it once
//! when a session starts ([`SessionFeatures::resolve`]) and never again for
//! the life of that session.

use crate::narrative::NarrativeStyle;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Renders segments in the first person.
pub const FIRST_PERSON_NARRATIVE: &str = "use_first_person_narrative";

/// Enables per-segment theme styling.
pub const DYNAMIC_THEMES: &str = "enable_dynamic_themes";

/// Enables the share action on the reader screen.
pub const STORY_SHARING: &str = "enable_story_sharing";

/// Errors from a flag provider.
#[derive(Debug, Error)]
pub enum FlagError {
    #[error("flag provider is not initialized")]
    NotInitialized,

    #[error("flag provider error: {0}")]
    Provider(String),
}

/// Source of boolean feature flags and remote config values.
pub trait FlagProvider: Send + Sync {
    /// Whether the named feature is enabled.
    fn has_feature(&self, name: &str) -> Result<bool, FlagError>;

    /// Remote config value attached to the named flag.
    fn value(&self, name: &str) -> Result<Option<String>, FlagError> {
        let _ = name;
        Ok(None)
    }
}

/// Look up a flag, treating any provider failure as "disabled".
pub fn feature_enabled(provider: &dyn FlagProvider, name: &str) -> bool {
    match provider.has_feature(name) {
        Ok(enabled) => enabled,
        Err(e) => {
            tracing::warn!(flag = name, error = %e, "flag lookup failed, treating as disabled");
            false
        }
    }
}

/// Fixed, in-memory flag set.
#[derive(Debug, Clone, Default)]
pub struct StaticFlags {
    enabled: HashSet<String>,
    values: HashMap<String, String>,
}

impl StaticFlags {
    /// No flags enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list of enabled flag names.
    ///
    /// `name=value` entries enable the flag and attach a value.
    pub fn from_list(list: &str) -> Self {
        let mut flags = Self::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once('=') {
                Some((name, value)) => {
                    flags = flags.with_value(name.trim(), value.trim());
                }
                None => {
                    flags = flags.enable(entry);
                }
            }
        }
        flags
    }

    /// Enable a flag.
    pub fn enable(mut self, name: impl Into<String>) -> Self {
        self.enabled.insert(name.into());
        self
    }

    /// Enable a flag with a value.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.enabled.insert(name.clone());
        self.values.insert(name, value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

impl FlagProvider for StaticFlags {
    fn has_feature(&self, name: &str) -> Result<bool, FlagError> {
        Ok(self.enabled.contains(name))
    }

    fn value(&self, name: &str) -> Result<Option<String>, FlagError> {
        Ok(self.values.get(name).cloned())
    }
}

impl FlagProvider for flagsmith::FlagSnapshot {
    fn has_feature(&self, name: &str) -> Result<bool, FlagError> {
        Ok(flagsmith::FlagSnapshot::has_feature(self, name))
    }

    fn value(&self, name: &str) -> Result<Option<String>, FlagError> {
        Ok(flagsmith::FlagSnapshot::value(self, name).map(str::to_string))
    }
}

/// Flags resolved once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionFeatures {
    pub narrative_style: NarrativeStyle,
    pub dynamic_themes: bool,
    pub story_sharing: bool,
}

impl SessionFeatures {
    /// Poll the provider for every flag the reader uses.
    pub fn resolve(provider: &dyn FlagProvider) -> Self {
        let features = Self {
            narrative_style: NarrativeStyle::from_first_person_flag(feature_enabled(
                provider,
                FIRST_PERSON_NARRATIVE,
            )),
            dynamic_themes: feature_enabled(provider, DYNAMIC_THEMES),
            story_sharing: feature_enabled(provider, STORY_SHARING),
        };
        tracing::debug!(?features, "resolved session features");
        features
    }
}
