//! Configuration for footprint-sync.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FOOTPRINT_WIKIBASE_*, FOOTPRINT_EMISSIONS_*)
//! 2. Config file (.footprint/config.yaml)
//! 3. Defaults (Wikidata, local emissions API)
//!
//! Config file discovery:
//! - Searches current directory and parents for .footprint/config.yaml
//! - Falls back to <user config dir>/footprint-sync/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::{EmissionsApiConfig, WikibaseConfig};
use crate::core::RetryPolicy;
use crate::domain::Vocabulary;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const ENV_WIKIBASE_API_URL: &str = "FOOTPRINT_WIKIBASE_API_URL";
pub const ENV_WIKIBASE_USERNAME: &str = "FOOTPRINT_WIKIBASE_USERNAME";
pub const ENV_WIKIBASE_PASSWORD: &str = "FOOTPRINT_WIKIBASE_PASSWORD";
pub const ENV_EMISSIONS_API_URL: &str = "FOOTPRINT_EMISSIONS_API_URL";
pub const ENV_EMISSIONS_API_TOKEN: &str = "FOOTPRINT_EMISSIONS_API_TOKEN";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub wikibase: WikibaseConfig,
    pub emissions: EmissionsApiConfig,
    /// Overrides of property, entity and category ids
    pub vocabulary: Vocabulary,
    pub retry: RetryPolicy,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub wikibase: WikibaseConfig,
    pub emissions: EmissionsApiConfig,
    pub vocabulary: Vocabulary,
    pub retry: RetryPolicy,
    pub http: HttpConfig,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Per-request HTTP timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Copy safe to print: secrets masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.wikibase.password.is_some() {
            copy.wikibase.password = Some("********".to_string());
        }
        if copy.emissions.api_token.is_some() {
            copy.emissions.api_token = Some("********".to_string());
        }
        copy
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".footprint").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Per-user config file, if one exists
fn user_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?
        .join("footprint-sync")
        .join("config.yaml");
    path.exists().then_some(path)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Layer environment overrides on top of a parsed file
pub fn resolve(
    file: ConfigFile,
    config_file: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let env = |key: &str| env(key).filter(|value| !value.is_empty());

    let mut wikibase = file.wikibase;
    if let Some(api_url) = env(ENV_WIKIBASE_API_URL) {
        wikibase.api_url = api_url;
    }
    if let Some(username) = env(ENV_WIKIBASE_USERNAME) {
        wikibase.username = Some(username);
    }
    if let Some(password) = env(ENV_WIKIBASE_PASSWORD) {
        wikibase.password = Some(password);
    }

    let mut emissions = file.emissions;
    if let Some(api_url) = env(ENV_EMISSIONS_API_URL) {
        emissions.api_url = api_url;
    }
    if let Some(token) = env(ENV_EMISSIONS_API_TOKEN) {
        emissions.api_token = Some(token);
    }

    ResolvedConfig {
        wikibase,
        emissions,
        vocabulary: file.vocabulary.with_default_categories(),
        retry: file.retry,
        http: file.http,
        config_file,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let config_file = find_config_file(&cwd).or_else(user_config_file);

    let file = match &config_file {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(resolve(file, config_file, |key| std::env::var(key).ok()))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
