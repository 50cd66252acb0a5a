use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{RegistryApi, RegistryCatalog, RegistryFamily};
use crate::Result;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SchemaOneManifest {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    #[serde(rename = "v1Compatibility")]
    v1_compatibility: String,
}

#[derive(Debug, Deserialize)]
struct V1Compatibility {
    created: String,
}

#[derive(Debug, Deserialize)]
struct HarborTag {
    push_time: Option<String>,
}

/// HTTP implementation of [`RegistryApi`] with basic auth from the catalog.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    client: Client,
    catalog: Arc<RegistryCatalog>,
}

impl HttpRegistryClient {
    pub fn new(catalog: Arc<RegistryCatalog>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, catalog })
    }

    fn authorized(&self, registry: &str, request: RequestBuilder) -> RequestBuilder {
        match self.catalog.credentials(registry) {
            Some(creds) => request.basic_auth(&creds.user, Some(&creds.password)),
            None => request,
        }
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        registry: &str,
        request: RequestBuilder,
    ) -> Option<T> {
        let response = match self.authorized(registry, request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(registry, "registry request failed: {e}");
                return None;
            }
        };
        if response.status() != StatusCode::OK {
            debug!(registry, status = %response.status(), "registry returned non-success status");
            return None;
        }
        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(registry, "failed to decode registry response: {e}");
                None
            }
        }
    }

    async fn generic_created_at(&self, registry: &str, image: &str, tag: &str) -> Option<String> {
        let url = format!(
            "{}/v2/{image}/manifests/{tag}",
            self.catalog.base_url(registry)
        );
        let manifest: SchemaOneManifest =
            self.fetch_json(registry, self.client.get(url)).await?;
        let entry = manifest.history.first()?;
        match serde_json::from_str::<V1Compatibility>(&entry.v1_compatibility) {
            Ok(v1) => Some(v1.created),
            Err(e) => {
                warn!(registry, image, tag, "unreadable manifest history: {e}");
                None
            }
        }
    }

    async fn harbor_created_at(&self, registry: &str, image: &str, tag: &str) -> Option<String> {
        let url = harbor_tags_url(&self.catalog.base_url(registry), image, tag)?;
        let request = self
            .client
            .get(url)
            .header("accept", "application/json")
            .query(&[
                ("page", "1"),
                ("page_size", "10"),
                ("with_signature", "false"),
                ("with_immutable_status", "false"),
            ]);
        let tags: Vec<HarborTag> = self.fetch_json(registry, request).await?;
        tags.into_iter().next()?.push_time
    }
}

/// `/api/v2.0/projects/<project>/repositories/<repo>/artifacts/<tag>/tags` with
/// nested repository names escaped into a single segment.
fn harbor_tags_url(base: &str, image: &str, tag: &str) -> Option<Url> {
    let (project, repository) = image.split_once('/')?;
    let mut url = Url::parse(base).ok()?;
    url.path_segments_mut()
        .ok()?
        .clear()
        .extend(["api", "v2.0", "projects", project, "repositories", repository])
        .extend(["artifacts", tag, "tags"]);
    Some(url)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[async_trait]
impl RegistryApi for HttpRegistryClient {
    async fn list_tags(&self, registry: &str, image: &str) -> Vec<String> {
        let url = format!(
            "{}/v2/{image}/tags/list",
            self.catalog.base_url(registry)
        );
        let request = self.client.get(url).query(&[("page_size", "1")]);
        let tags = self
            .fetch_json::<TagList>(registry, request)
            .await
            .and_then(|list| list.tags)
            .unwrap_or_default();
        if tags.is_empty() {
            warn!(registry, image, "no tags listed for image");
        }
        tags
    }

    async fn tag_created_at(
        &self,
        registry: &str,
        image: &str,
        tag: &str,
    ) -> Option<DateTime<Utc>> {
        let raw = match self.catalog.family(registry)? {
            RegistryFamily::GenericV2 => self.generic_created_at(registry, image, tag).await,
            RegistryFamily::Harbor => self.harbor_created_at(registry, image, tag).await,
        }?;
        let parsed = parse_timestamp(&raw);
        if parsed.is_none() {
            warn!(registry, image, tag, raw = %raw, "unparsable tag timestamp");
        }
        parsed
    }
}
