pub mod sources;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use vulnwatch_core::notify::LinkConfig;
use vulnwatch_core::registry::{RegistryCatalog, RegistryCredentials};
use vulnwatch_core::types::NamingRules;

pub const DEFAULT_SCANNERS_PROJECT: u64 = 5425;
pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_WORK_DIR: &str = "./.tmp";
pub const DEFAULT_PROJECTS_PATH: &str = "config/projects.json";
pub const DEFAULT_REGISTRY_SCHEME: &str = "https";

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub source_control: SourceControlConfig,
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
    pub registries: RegistriesConfig,
    pub naming: NamingRules,
    pub links: LinkConfig,
    pub pipeline: PipelineConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Clone)]
pub struct TrackerConfig {
    pub host: String,
    pub token: String,
}

impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct SourceControlConfig {
    pub host: String,
    pub token: String,
    /// Project id of the repository holding scanner definitions.
    pub scanners_project: u64,
}

impl fmt::Debug for SourceControlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceControlConfig")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("scanners_project", &self.scanners_project)
            .finish()
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Clone)]
pub struct ChatConfig {
    pub host: String,
    pub user_id: String,
    pub auth_token: String,
    pub room_id: String,
    pub thread_id: Option<String>,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("host", &self.host)
            .field("user_id", &self.user_id)
            .field("auth_token", &"<redacted>")
            .field("room_id", &self.room_id)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

/// Registry families and login credentials.
#[derive(Debug, Clone, Default)]
pub struct RegistriesConfig {
    pub scheme: String,
    pub generic_hosts: BTreeSet<String>,
    pub harbor_hosts: BTreeSet<String>,
    pub credentials: HashMap<String, RegistryCredentials>,
}

impl RegistriesConfig {
    pub fn catalog(&self) -> RegistryCatalog {
        let mut catalog = RegistryCatalog::new(self.scheme.clone());
        catalog.generic_hosts = self.generic_hosts.clone();
        catalog.harbor_hosts = self.harbor_hosts.clone();
        catalog.credentials = self.credentials.clone();
        catalog
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub page_size: usize,
    pub work_dir: PathBuf,
    pub projects_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            projects_path: PathBuf::from(DEFAULT_PROJECTS_PATH),
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
