//! Container registry lookups used to pick the image tag to scan.

pub mod client;
pub mod resolver;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub use client::HttpRegistryClient;
pub use resolver::TagResolver;

/// API dialect used to read a tag's creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryFamily {
    /// Docker Registry v2: schema-1 manifest history.
    GenericV2,
    /// Harbor artifact tags API.
    Harbor,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryCredentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Known registries: their API family and login credentials.
#[derive(Debug, Clone, Default)]
pub struct RegistryCatalog {
    pub scheme: String,
    pub generic_hosts: BTreeSet<String>,
    pub harbor_hosts: BTreeSet<String>,
    pub credentials: HashMap<String, RegistryCredentials>,
}

impl RegistryCatalog {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            ..Self::default()
        }
    }

    /// Hosts listed under both families resolve as generic.
    pub fn family(&self, registry: &str) -> Option<RegistryFamily> {
        if self.generic_hosts.contains(registry) {
            Some(RegistryFamily::GenericV2)
        } else if self.harbor_hosts.contains(registry) {
            Some(RegistryFamily::Harbor)
        } else {
            None
        }
    }

    pub fn credentials(&self, registry: &str) -> Option<&RegistryCredentials> {
        self.credentials.get(registry)
    }

    pub fn base_url(&self, registry: &str) -> String {
        let scheme = if self.scheme.is_empty() {
            "https"
        } else {
            self.scheme.as_str()
        };
        format!("{scheme}://{registry}")
    }
}

#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Tags of `image` on `registry`; empty when the listing failed.
    async fn list_tags(&self, registry: &str, image: &str) -> Vec<String>;

    /// Creation or push time of one tag, `None` when it could not be read.
    async fn tag_created_at(
        &self,
        registry: &str,
        image: &str,
        tag: &str,
    ) -> Option<DateTime<Utc>>;
}
