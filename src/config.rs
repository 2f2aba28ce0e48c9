use crate::constants::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MIN_HASH_LENGTH};
use crate::error::{ImporterError, Result};
use crate::intune::GraphCredentials;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub intune: IntuneConfig,
    /// Group-tag vocabulary: display name shown to operators, backend tag
    /// sent to Intune. Injected here so the pipeline never reads ambient state.
    #[serde(default = "default_group_tags")]
    pub group_tags: Vec<GroupTag>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntuneConfig {
    pub max_batch_size: usize,
    pub min_hash_length: usize,
    pub timeout_seconds: u64,
}

impl Default for IntuneConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            min_hash_length: DEFAULT_MIN_HASH_LENGTH,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GroupTag {
    pub display_name: String,
    pub tag: String,
}

fn default_group_tags() -> Vec<GroupTag> {
    [
        ("Finance Department", "FinanceDept"),
        ("IT Support", "ITSupport"),
        ("Sales Team", "SalesTeam"),
        ("HR Department", "HRDepartment"),
        ("Engineering", "Engineering"),
    ]
    .into_iter()
    .map(|(display_name, tag)| GroupTag {
        display_name: display_name.to_string(),
        tag: tag.to_string(),
    })
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intune: IntuneConfig::default(),
            group_tags: default_group_tags(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        if !Path::new(config_path).exists() {
            debug!("no {config_path} found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(config_path)
    }

    pub fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ImporterError::Config(format!("Failed to read config file '{path}': {e}"))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Maps an operator-facing display name (or an exact backend tag) to the
    /// backend tag Intune expects.
    pub fn resolve_group_tag(&self, name: &str) -> Option<&str> {
        self.group_tags
            .iter()
            .find(|entry| entry.display_name == name || entry.tag == name)
            .map(|entry| entry.tag.as_str())
    }
}

/// Reads Graph credentials from the environment. Missing variables come back
/// as empty fields; the submission client reports those as an unconfigured
/// outcome instead of an error.
pub fn credentials_from_env() -> GraphCredentials {
    GraphCredentials {
        tenant_id: env::var("INTUNE_TENANT_ID").unwrap_or_default(),
        client_id: env::var("INTUNE_CLIENT_ID").unwrap_or_default(),
        client_secret: env::var("INTUNE_CLIENT_SECRET").unwrap_or_default(),
    }
}
