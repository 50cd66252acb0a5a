use thiserror::Error;
use url::Url;

use crate::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("{key} is not a valid URL: {reason}")]
    InvalidUrl { key: &'static str, reason: String },
    #[error("registry scheme must be http or https, got `{scheme}`")]
    InvalidRegistryScheme { scheme: String },
    #[error("engagement naming needs at least one {field} prefix")]
    EmptyNamingPrefixes { field: &'static str },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

/// Rejects unusable settings and normalizes recoverable ones, reporting
/// each adjustment as a warning.
pub fn apply_guard_rails(config: &mut Config) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    for (key, value) in [
        ("DD_HOST", &config.tracker.host),
        ("GIT_HOST", &config.source_control.host),
        ("ROCKET_HOST", &config.chat.host),
    ] {
        let url = Url::parse(value).map_err(|e| ConfigGuardRailError::InvalidUrl {
            key,
            reason: e.to_string(),
        })?;
        if url.scheme() == "http" {
            warnings.push_with_hint(
                format!("{key} uses plain HTTP; API tokens are sent unencrypted"),
                format!("Point {key} at an https:// endpoint"),
            );
        }
    }

    let scheme = config.registries.scheme.as_str();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigGuardRailError::InvalidRegistryScheme {
            scheme: scheme.to_string(),
        });
    }

    if config.naming.target_prefixes.is_empty() {
        return Err(ConfigGuardRailError::EmptyNamingPrefixes { field: "target" });
    }
    if config.naming.scanner_prefixes.is_empty() {
        return Err(ConfigGuardRailError::EmptyNamingPrefixes { field: "scanner" });
    }

    let mut unknown: Vec<&String> = config
        .registries
        .credentials
        .keys()
        .filter(|host| {
            !config.registries.generic_hosts.contains(*host)
                && !config.registries.harbor_hosts.contains(*host)
        })
        .collect();
    unknown.sort();
    for host in unknown {
        warnings.push_with_hint(
            format!("registry {host} has credentials but no known API family"),
            "List it under [registries] harbor or generic; its images cannot resolve tags",
        );
    }

    if config.pipeline.page_size == 0 {
        config.pipeline.page_size = 1;
        warnings.push("pipeline.page_size of 0 clamped to 1");
    }

    Ok(warnings)
}
