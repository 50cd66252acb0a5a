use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{MonitorError, Result};

const TREE_PAGE_SIZE: &str = "100";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote store of scanner definition files.
#[async_trait]
pub trait ScannerConfigSource: Send + Sync {
    /// Paths of every file in listing order.
    async fn list_files(&self) -> Result<Vec<String>>;
    async fn read_file(&self, path: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Scanner definitions kept in a GitLab repository.
#[derive(Debug, Clone)]
pub struct GitlabConfigRepository {
    client: Client,
    host: Url,
    token: String,
    project_id: u64,
}

impl GitlabConfigRepository {
    pub fn new(host: &str, token: &str, project_id: u64) -> Result<Self> {
        let host = Url::parse(host).map_err(|e| {
            MonitorError::InvalidInput(format!("invalid source-control host {host}: {e}"))
        })?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            host,
            token: token.to_string(),
            project_id,
        })
    }

    fn repository_url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.host.clone();
        let project_id = self.project_id.to_string();
        url.path_segments_mut()
            .map_err(|_| MonitorError::InvalidInput("source-control host cannot be a base".into()))?
            .pop_if_empty()
            .extend(["api", "v4", "projects", project_id.as_str(), "repository"])
            .extend(tail);
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(MonitorError::Internal(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ScannerConfigSource for GitlabConfigRepository {
    async fn list_files(&self) -> Result<Vec<String>> {
        let url = self.repository_url(&["tree"])?;
        let mut files = Vec::new();
        let mut page = "1".to_string();

        loop {
            let response = self
                .get(
                    url.clone(),
                    &[("per_page", TREE_PAGE_SIZE), ("page", page.as_str())],
                )
                .await?;
            let next = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);

            let entries: Vec<TreeEntry> = response.json().await?;
            debug!(page = %page, entries = entries.len(), "listed scanner config tree page");
            files.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.kind == "blob")
                    .map(|entry| entry.path),
            );

            match next {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(files)
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let url = self.repository_url(&["files", path, "raw"])?;
        Ok(self.get(url, &[]).await?.text().await?)
    }
}
