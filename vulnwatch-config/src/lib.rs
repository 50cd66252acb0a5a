//! Configuration for the vulnwatch service.
//!
//! Settings are layered: an optional `.env` file is loaded into the process
//! environment, an optional TOML file supplies non-secret defaults, and
//! environment variables win over both. Secrets (tokens, passwords, the
//! database URL) are only read from the environment.

pub mod loader;
pub mod models;
pub mod projects;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    ChatConfig, Config, ConfigMetadata, DatabaseConfig, PipelineConfig, RegistriesConfig,
    SourceControlConfig, TrackerConfig,
};
pub use projects::load_project_descriptors;
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
