pub mod error;

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use vulnwatch_core::registry::RegistryCredentials;

use self::error::ConfigLoadError;
use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{
    ChatConfig, Config, ConfigMetadata, DEFAULT_PAGE_SIZE, DEFAULT_PROJECTS_PATH,
    DEFAULT_REGISTRY_SCHEME, DEFAULT_SCANNERS_PROJECT, DEFAULT_WORK_DIR, DatabaseConfig,
    PipelineConfig, RegistriesConfig, SourceControlConfig, TrackerConfig,
};
use crate::validation::{self, ConfigWarnings};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["vulnwatch.toml", "config/vulnwatch.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    /// Loads `.env`, reads the process environment and composes the result.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| ()),
            None => dotenvy::dotenv().map(|_| ()),
        };
        let env_file_loaded = match loaded {
            Ok(()) => true,
            Err(dotenvy::Error::Io(_)) => false,
            Err(err) => return Err(err.into()),
        };

        self.load_from_env(EnvConfig::gather(), env_file_loaded)
    }

    /// Composes configuration from an already gathered environment.
    pub fn load_from_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file, config_path) = self.load_file_config(&env)?;
        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No vulnwatch.toml detected; registry families and naming use defaults",
                "Set VULNWATCH_CONFIG or create vulnwatch.toml to list harbor/generic registries",
            );
        }

        let mut config = compose(
            file.unwrap_or_default(),
            env,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )?;
        warnings.extend(validation::apply_guard_rails(&mut config)?);

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => return Err(ConfigLoadError::MissingConfig { path }),
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let file: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;
        Ok((Some(file), Some(path)))
    }
}

/// Merges file and environment values. Environment wins; secrets must come
/// from the environment.
fn compose(
    file: FileConfig,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<Config, ConfigLoadError> {
    let mut missing = Vec::new();
    let mut require = |key: &'static str, value: Option<String>| {
        value.unwrap_or_else(|| {
            missing.push(key);
            String::new()
        })
    };

    let tracker = TrackerConfig {
        host: require("DD_HOST", env.tracker_host.or(file.tracker.host)),
        token: require("DD_TOKEN", env.tracker_token),
    };
    let git_host = require("GIT_HOST", env.git_host.or(file.source_control.host));
    let git_token = require("GIT_TOKEN", env.git_token);
    let database_url = require("DB_CONNECT_URL", env.database_url);
    let chat = ChatConfig {
        host: require("ROCKET_HOST", env.chat_host.or(file.chat.host)),
        user_id: require("ROCKET_USERNAME", env.chat_user),
        auth_token: require("ROCKET_PASSWORD", env.chat_token),
        room_id: require("ROCKET_CHAT_ID", env.chat_room.or(file.chat.room_id)),
        thread_id: file.chat.thread_id,
    };

    if !missing.is_empty() {
        return Err(ConfigLoadError::Missing { keys: missing });
    }

    let scanners_project = match env.scanners_project {
        Some(raw) => parse_number("SCANNERS_CONFIG_PROJECT", &raw)?,
        None => file
            .source_control
            .scanners_project
            .unwrap_or(DEFAULT_SCANNERS_PROJECT),
    };
    let max_connections = match env.database_max_connections {
        Some(raw) => Some(parse_number("DB_MAX_CONNECTIONS", &raw)?),
        None => file.database.max_connections,
    };

    let registries = RegistriesConfig {
        scheme: file
            .registries
            .scheme
            .unwrap_or_else(|| DEFAULT_REGISTRY_SCHEME.to_string()),
        generic_hosts: file.registries.generic.into_iter().collect::<BTreeSet<_>>(),
        harbor_hosts: file.registries.harbor.into_iter().collect::<BTreeSet<_>>(),
        credentials: parse_credentials(env.registries_credentials.as_deref())?,
    };

    let pipeline = PipelineConfig {
        page_size: file.pipeline.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        work_dir: env
            .work_dir
            .or(file.pipeline.work_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
        projects_path: env
            .projects_path
            .or(file.pipeline.projects_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECTS_PATH)),
    };

    let mut links = file.links.unwrap_or_default();
    if links.tracker_base.is_empty() {
        links.tracker_base = tracker.host.clone();
    }
    if links.source_base.is_empty() {
        links.source_base = git_host.clone();
    }

    Ok(Config {
        tracker,
        source_control: SourceControlConfig {
            host: git_host,
            token: git_token,
            scanners_project,
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections,
        },
        chat,
        registries,
        naming: file.naming.unwrap_or_default(),
        links,
        pipeline,
        metadata,
    })
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigLoadError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigLoadError::InvalidNumber {
            key,
            value: raw.to_string(),
        })
}

fn parse_credentials(
    raw: Option<&str>,
) -> Result<HashMap<String, RegistryCredentials>, ConfigLoadError> {
    match raw {
        None => Ok(HashMap::new()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|source| ConfigLoadError::InvalidRegistryCredentials { source }),
    }
}
