use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vulnwatch_core::notify::LinkConfig;
use vulnwatch_core::types::NamingRules;

/// Raw configuration as defined in a TOML file. Secrets never live here.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub tracker: FileTrackerConfig,
    #[serde(default)]
    pub source_control: FileSourceControlConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub chat: FileChatConfig,
    #[serde(default)]
    pub registries: FileRegistriesConfig,
    pub naming: Option<NamingRules>,
    pub links: Option<LinkConfig>,
    #[serde(default)]
    pub pipeline: FilePipelineConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileTrackerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSourceControlConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanners_project: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileChatConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRegistriesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default)]
    pub generic: Vec<String>,
    #[serde(default)]
    pub harbor: Vec<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FilePipelineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_path: Option<PathBuf>,
}

/// Environment-derived configuration values. Empty variables count as unset.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub tracker_host: Option<String>,
    pub tracker_token: Option<String>,
    pub git_host: Option<String>,
    pub git_token: Option<String>,
    pub scanners_project: Option<String>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<String>,
    pub chat_host: Option<String>,
    pub chat_user: Option<String>,
    pub chat_token: Option<String>,
    pub chat_room: Option<String>,
    pub registries_credentials: Option<String>,
    pub projects_path: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the view from any key lookup; `gather` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            config_path: var("VULNWATCH_CONFIG").map(PathBuf::from),
            tracker_host: var("DD_HOST"),
            tracker_token: var("DD_TOKEN"),
            git_host: var("GIT_HOST"),
            git_token: var("GIT_TOKEN"),
            scanners_project: var("SCANNERS_CONFIG_PROJECT"),
            database_url: var("DB_CONNECT_URL").or_else(|| var("DATABASE_URL")),
            database_max_connections: var("DB_MAX_CONNECTIONS"),
            chat_host: var("ROCKET_HOST"),
            chat_user: var("ROCKET_USERNAME"),
            chat_token: var("ROCKET_PASSWORD"),
            chat_room: var("ROCKET_CHAT_ID"),
            registries_credentials: var("REGISTRIES_CREDENTIALS"),
            projects_path: var("PROJECTS_CONFIG_PATH").map(PathBuf::from),
            work_dir: var("WORK_DIR").map(PathBuf::from),
        }
    }
}
