//! Configuration system for fraudlab.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> explicit file -> environment. Configuration is loaded
//! from the user config dir (`config.toml`) and/or `.fraudlab/config.toml`
//! in the workspace directory.

use crate::error::FraudlabError;
use crate::policy::is_disposable;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FraudlabConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

impl FraudlabConfig {
    /// Reject settings that would let a cleanup pass wipe the catalogs this
    /// crate builds.
    pub fn validate(&self) -> Result<(), FraudlabError> {
        if is_disposable(&self.demo.catalog_prefix) {
            return Err(FraudlabError::invalid_input(format!(
                "demo.catalog_prefix '{}' must contain \"playground\", or cleanup would delete playground catalogs",
                self.demo.catalog_prefix
            )));
        }
        Ok(())
    }
}

/// Connection to the feature-store REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token, if the deployment requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Page size for listing endpoints.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Catalog to activate when a session starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_catalog: Option<String>,
    /// Catalog the platform treats as active until another is activated.
    #[serde(default = "default_catalog")]
    pub default_catalog: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
            active_catalog: None,
            default_catalog: default_catalog(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8088".to_string()
}

fn default_catalog() -> String {
    "default".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> usize {
    100
}

/// Cleanup pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Log per-catalog counts before cleaning.
    #[serde(default = "default_true")]
    pub verbose: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { verbose: true }
    }
}

/// Credit-card demo settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Feature store whose data source holds the demo tables.
    #[serde(default = "default_feature_store")]
    pub feature_store: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    /// Prefix of generated playground catalog names.
    #[serde(default = "default_catalog_prefix")]
    pub catalog_prefix: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            feature_store: default_feature_store(),
            database_name: default_database(),
            schema_name: default_schema(),
            catalog_prefix: default_catalog_prefix(),
        }
    }
}

fn default_feature_store() -> String {
    "playground".to_string()
}

fn default_database() -> String {
    "spark_catalog".to_string()
}

fn default_schema() -> String {
    "CREDITCARD".to_string()
}

fn default_catalog_prefix() -> String {
    "credit card playground".to_string()
}

fn default_true() -> bool {
    true
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "fraudlab", "fraudlab")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Path of the workspace-local config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".fraudlab").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`FRAUDLAB_STORE__BASE_URL`, ...)
/// 2. Explicit config file
/// 3. Workspace-local config (`.fraudlab/config.toml`)
/// 4. User config
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<FraudlabConfig, FraudlabError> {
    let mut figment = Figment::from(Serialized::defaults(FraudlabConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(FraudlabError::invalid_input(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("FRAUDLAB_").split("__"));

    let config: FraudlabConfig = figment
        .extract()
        .map_err(|e| FraudlabError::Config(Box::new(e)))?;
    config.validate()?;
    Ok(config)
}

/// Write the default configuration to the workspace, unless one exists.
///
/// Returns the path and whether a file was written.
pub fn init_workspace_config(workspace: &Path) -> Result<(PathBuf, bool), FraudlabError> {
    let path = workspace_config_path(workspace);
    if path.exists() {
        return Ok((path, false));
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(&FraudlabConfig::default())?;
    std::fs::write(&path, content)?;
    Ok((path, true))
}
