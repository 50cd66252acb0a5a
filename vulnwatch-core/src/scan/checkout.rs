use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use reqwest::Url;
use tokio::process::Command;
use tracing::info;

use super::workspace::clean_dir;
use crate::{MonitorError, Result};

const CLONE_USER: &str = "continuous-monitoring";

/// Produces a fresh working copy of a source repository.
#[async_trait]
pub trait SourceCheckout: Send + Sync {
    async fn checkout(&self, source_url: &str, branch: &str, dest: &Path) -> Result<()>;
}

/// Shallow `git clone` over HTTPS with token credentials.
#[derive(Clone)]
pub struct GitCheckout {
    host: Url,
    token: String,
}

impl std::fmt::Debug for GitCheckout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCheckout")
            .field("host", &self.host.as_str())
            .finish_non_exhaustive()
    }
}

impl GitCheckout {
    pub fn new(host: &str, token: &str) -> Result<Self> {
        let host = Url::parse(host).map_err(|e| {
            MonitorError::InvalidInput(format!("invalid source-control host {host}: {e}"))
        })?;
        Ok(Self {
            host,
            token: token.to_string(),
        })
    }

    /// Repository URL without credentials, safe to log.
    pub fn repository_url(&self, source_url: &str) -> Result<Url> {
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|_| MonitorError::InvalidInput("source-control host cannot be a base".into()))?
            .pop_if_empty()
            .extend(source_url.trim_matches('/').split('/'));
        Ok(url)
    }

    fn clone_url(&self, source_url: &str) -> Result<Url> {
        let mut url = self.repository_url(source_url)?;
        let invalid = |_| MonitorError::InvalidInput("source-control host does not accept credentials".into());
        url.set_username(CLONE_USER).map_err(invalid)?;
        url.set_password(Some(&self.token)).map_err(invalid)?;
        Ok(url)
    }
}

#[async_trait]
impl SourceCheckout for GitCheckout {
    async fn checkout(&self, source_url: &str, branch: &str, dest: &Path) -> Result<()> {
        clean_dir(dest).await?;
        let url = self.clone_url(source_url)?;

        let output = Command::new("git")
            .args(["clone", "--quiet", "--depth", "1", "--branch", branch])
            .arg(url.as_str())
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).replace(&self.token, "***");
            return Err(MonitorError::Internal(format!(
                "git clone of {source_url}@{branch} failed: {}",
                stderr.trim()
            )));
        }

        info!(
            repository = %self.repository_url(source_url)?,
            dest = %dest.display(),
            "repository cloned"
        );
        Ok(())
    }
}
