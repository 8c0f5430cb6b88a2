//! Minimal Flagsmith client.
//!
//! Fetches the flag snapshot for one environment. The snapshot is a plain
//! value: callers fetch it once and answer lookups from it for the rest of
//! their lifetime.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

const API_BASE: &str = "https://edge.api.flagsmith.com/api/v1";

/// Errors that can occur when using the Flagsmith client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Environment ID not configured")]
    NoEnvironment,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Flagsmith API client bound to one environment.
#[derive(Clone)]
pub struct Flagsmith {
    client: reqwest::Client,
    environment_id: String,
    base_url: String,
}

impl Flagsmith {
    /// Create a client for the given client-side environment ID.
    pub fn new(environment_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            environment_id: environment_id.into(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Create a client from the FLAGSMITH_ENVIRONMENT_ID environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let id = std::env::var("FLAGSMITH_ENVIRONMENT_ID").map_err(|_| Error::NoEnvironment)?;
        if id.trim().is_empty() || id == "Not configured" {
            return Err(Error::NoEnvironment);
        }
        Ok(Self::new(id))
    }

    /// Use a self-hosted Flagsmith instance.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch every flag of the environment.
    pub async fn fetch(&self) -> Result<FlagSnapshot, Error> {
        let response = self
            .client
            .get(format!("{}/flags/", self.base_url))
            .headers(self.build_headers()?)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let states: Vec<ApiFeatureState> = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        let snapshot = FlagSnapshot::from_states(states);
        tracing::debug!(flags = snapshot.len(), "fetched flag snapshot");
        Ok(snapshot)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Environment-Key",
            HeaderValue::from_str(&self.environment_id)
                .map_err(|e| Error::Config(format!("Invalid environment ID: {e}")))?,
        );
        Ok(headers)
    }
}

/// One flag as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub enabled: bool,
    pub value: Option<String>,
}

/// Immutable set of flags fetched from one environment.
#[derive(Debug, Clone, Default)]
pub struct FlagSnapshot {
    flags: HashMap<String, Flag>,
}

impl FlagSnapshot {
    /// Build a snapshot from explicit flags.
    pub fn from_flags(flags: impl IntoIterator<Item = (String, Flag)>) -> Self {
        Self {
            flags: flags.into_iter().collect(),
        }
    }

    fn from_states(states: Vec<ApiFeatureState>) -> Self {
        let flags = states
            .into_iter()
            .map(|state| {
                let value = match state.feature_state_value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                };
                (
                    state.feature.name,
                    Flag {
                        enabled: state.enabled,
                        value,
                    },
                )
            })
            .collect();
        Self { flags }
    }

    /// Whether the named flag exists and is enabled.
    pub fn has_feature(&self, name: &str) -> bool {
        self.flags.get(name).is_some_and(|f| f.enabled)
    }

    /// Remote config value of the named flag.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(|f| f.value.as_deref())
    }

    /// Look up a flag.
    pub fn get(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }

    /// Iterate over all flags.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Flag)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiFeatureState {
    feature: ApiFeature,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    feature_state_value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiFeature {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAGS_BODY: &str = r#"[
        {"id": 1, "feature": {"id": 10, "name": "use_first_person_narrative", "type": "STANDARD"}, "enabled": true, "feature_state_value": null},
        {"id": 2, "feature": {"id": 11, "name": "enable_dynamic_themes", "type": "STANDARD"}, "enabled": false, "feature_state_value": "dark"},
        {"id": 3, "feature": {"id": 12, "name": "max_stories", "type": "STANDARD"}, "enabled": true, "feature_state_value": 6}
    ]"#;

    #[test]
    fn test_snapshot_from_api_body() {
        let states: Vec<ApiFeatureState> = serde_json::from_str(FLAGS_BODY).unwrap();
        let snapshot = FlagSnapshot::from_states(states);

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.has_feature("use_first_person_narrative"));
        assert!(!snapshot.has_feature("enable_dynamic_themes"));
        assert!(!snapshot.has_feature("missing_flag"));
        assert_eq!(snapshot.value("enable_dynamic_themes"), Some("dark"));
        assert_eq!(snapshot.value("max_stories"), Some("6"));
        assert_eq!(snapshot.value("use_first_person_narrative"), None);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = FlagSnapshot::default();
        assert!(snapshot.is_empty());
        assert!(!snapshot.has_feature("anything"));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = Flagsmith::new("env-key").with_base_url("https://flags.example.com/api/v1/");
        assert_eq!(client.base_url, "https://flags.example.com/api/v1");
    }
}
