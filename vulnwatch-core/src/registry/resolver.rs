use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::RegistryApi;

pub const LATEST_TAG: &str = "latest";

/// Picks the most recently published tag of an image.
#[derive(Clone)]
pub struct TagResolver {
    api: Arc<dyn RegistryApi>,
}

impl std::fmt::Debug for TagResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagResolver").finish_non_exhaustive()
    }
}

impl TagResolver {
    pub fn new(api: Arc<dyn RegistryApi>) -> Self {
        Self { api }
    }

    /// A listed `latest` tag wins without any timestamp lookups. Otherwise
    /// every tag's timestamp is fetched concurrently, failed lookups are
    /// dropped, and the newest tag is returned. Ties keep listing order.
    pub async fn resolve_latest_tag(&self, registry: &str, image: &str) -> Option<String> {
        let tags = self.api.list_tags(registry, image).await;
        if tags.iter().any(|tag| tag == LATEST_TAG) {
            return Some(LATEST_TAG.to_string());
        }

        let lookups = tags.iter().map(|tag| async move {
            let created = self.api.tag_created_at(registry, image, tag).await;
            (tag, created)
        });

        let newest = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(tag, created)| created.map(|ts| (tag, ts)))
            .fold(None, |best: Option<(&String, _)>, (tag, ts)| match best {
                Some((_, best_ts)) if best_ts >= ts => best,
                _ => Some((tag, ts)),
            });

        match newest {
            Some((tag, ts)) => {
                debug!(registry, image, tag = %tag, created = %ts, "resolved newest tag");
                Some(tag.clone())
            }
            None => {
                warn!(registry, image, "no tag with a readable timestamp");
                None
            }
        }
    }
}
