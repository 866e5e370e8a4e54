use serde::Deserialize;
use std::path::PathBuf;

use crate::github::DEFAULT_API_URL;
use crate::types::{SortKey, SortOrder, DEFAULT_LANGUAGE, DEFAULT_PER_PAGE};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub per_page: u32,
    pub language: String,
    pub sort: SortKey,
    pub order: SortOrder,
    pub clone_dir: Option<String>,
    pub clone_concurrency: Option<usize>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            language: DEFAULT_LANGUAGE.to_string(),
            sort: SortKey::default(),
            order: SortOrder::default(),
            clone_dir: None,
            clone_concurrency: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token_env: Option<String>,
    pub token_command: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_env: Some("GITHUB_TOKEN".to_string()),
            token_command: Some("gh auth token".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub github: GitHubConfig,
}

pub fn config_dir() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("grab"))
}

fn config_path() -> Option<PathBuf> {
    Some(config_dir()?.join("config.toml"))
}

impl Config {
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Config::default();
        };

        let Ok(content) = std::fs::read_to_string(&path) else {
            return Config::default();
        };

        Self::parse(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
            Config::default()
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Default destination offered by the clone prompt, with `~` expanded.
    pub fn clone_dir(&self) -> Option<PathBuf> {
        self.general.clone_dir.as_deref().map(expand_home)
    }
}

pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}
