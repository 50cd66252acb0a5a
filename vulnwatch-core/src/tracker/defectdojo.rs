//! DefectDojo REST adapter for [`FindingsTracker`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use super::FindingsTracker;
use super::report::ReportUpload;
use crate::types::{
    EndpointId, Engagement, EngagementId, EngagementKind, EngagementScope, FindingsCount,
    ImageEngagement, LastUpdate, NamingRules, ProductId, TestId,
};
use crate::{MonitorError, Result};

const API_PRODUCTS: &str = "/api/v2/products/";
const API_ENGAGEMENTS: &str = "/api/v2/engagements/";
const API_ENDPOINTS: &str = "/api/v2/endpoints/";
const API_IMPORT_SCAN: &str = "/api/v2/import-scan/";
const LIST_LIMIT: &str = "100";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductRef {
    id: ProductId,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProductDetail {
    #[serde(default)]
    findings_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EndpointRef {
    id: EndpointId,
    #[serde(default)]
    protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    #[serde(default)]
    test_id: Option<TestId>,
    #[serde(default)]
    test: Option<TestId>,
}

pub struct DefectDojoClient {
    client: Client,
    base_url: Url,
    auth_header: String,
    naming: NamingRules,
}

impl std::fmt::Debug for DefectDojoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefectDojoClient")
            .field("base_url", &self.base_url.as_str())
            .field("naming", &self.naming)
            .finish()
    }
}

impl DefectDojoClient {
    pub fn new(host: &str, token: &str, naming: NamingRules) -> Result<Self> {
        let base_url = Url::parse(host.trim_end_matches('/')).map_err(|e| {
            MonitorError::InvalidInput(format!("invalid tracker host {host}: {e}"))
        })?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            auth_header: format!("Token {token}"),
            naming,
        })
    }

    fn endpoint(&self, path: &str) -> Option<Url> {
        match self.base_url.join(path) {
            Ok(url) => Some(url),
            Err(e) => {
                error!(path, "failed to build tracker url: {e}");
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Option<T> {
        let response = self
            .client
            .get(url.clone())
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, "tracker request failed: {e}");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            warn!(url = %url, status = %response.status(), "tracker returned non-success status");
            return None;
        }

        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url = %url, "failed to decode tracker response: {e}");
                None
            }
        }
    }

    /// Walks every page of a listing by following `next` links.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Option<Vec<T>> {
        let mut items = Vec::new();
        let mut page: Page<T> = self.get_json(self.endpoint(path)?, query).await?;
        loop {
            items.append(&mut page.results);
            let Some(next) = page.next.take() else {
                break;
            };
            let next = match Url::parse(&next) {
                Ok(url) => url,
                Err(e) => {
                    warn!(next, "ignoring unparsable pagination link: {e}");
                    break;
                }
            };
            page = self.get_json(next, &[]).await?;
        }
        Some(items)
    }

    async fn engagements(&self, product: ProductId) -> Option<Vec<Engagement>> {
        let query = [
            ("product", product.to_string()),
            ("limit", LIST_LIMIT.to_string()),
        ];
        let engagements = self.list_all::<Engagement>(API_ENGAGEMENTS, &query).await;
        if engagements.is_none() {
            error!(product_id = %product, "failed to get engagements");
        }
        engagements
    }

    async fn post_report(&self, report: &ReportUpload) -> Result<Option<TestId>> {
        let contents = tokio::fs::read(&report.path).await?;
        let form = report.into_form(contents)?;
        let url = self
            .endpoint(API_IMPORT_SCAN)
            .ok_or_else(|| MonitorError::Internal("import url unavailable".into()))?;

        let response = self
            .client
            .post(url)
            .header("Authorization", &self.auth_header)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Internal(format!(
                "import rejected with {status}: {body}"
            )));
        }

        let body: ImportResponse = response.json().await?;
        Ok(body.test_id.or(body.test))
    }
}

#[async_trait]
impl FindingsTracker for DefectDojoClient {
    async fn find_product(&self, name: &str) -> Option<ProductId> {
        let url = self.endpoint(API_PRODUCTS)?;
        // `name` is a substring filter; only an exact match identifies the product.
        let page: Page<ProductRef> = self.get_json(url, &[("name", name.to_string())]).await?;
        let product = page.results.iter().find(|p| p.name == name).map(|p| p.id);
        if product.is_none() {
            error!(product = name, "failed to get product");
        }
        product
    }

    async fn product_findings(&self, product: ProductId) -> FindingsCount {
        let Some(url) = self.endpoint(&format!("{API_PRODUCTS}{product}/")) else {
            return FindingsCount::Unavailable;
        };
        let detail: Option<ProductDetail> = self.get_json(url, &[]).await;
        match detail.and_then(|d| d.findings_count) {
            Some(count) if count >= 0 => FindingsCount::Count(count as u64),
            _ => FindingsCount::Unavailable,
        }
    }

    async fn engagement_for_branch(
        &self,
        product: ProductId,
        branch: &str,
    ) -> Option<EngagementId> {
        let found = self
            .engagements(product)
            .await?
            .into_iter()
            .find(|e| e.branch_tag.as_deref() == Some(branch))
            .map(|e| e.id);
        if found.is_none() {
            warn!(product_id = %product, branch, "no engagement for branch");
        }
        found
    }

    async fn last_engagement_update(
        &self,
        product: ProductId,
        scope: EngagementScope,
    ) -> Option<LastUpdate> {
        let latest = self
            .engagements(product)
            .await?
            .iter()
            .filter(|e| self.naming.matches_scope(&e.name, scope))
            .filter_map(|e| {
                let day = e.updated_on();
                if day.is_none() {
                    debug!(engagement_id = %e.id, "engagement without a readable update time");
                }
                day
            })
            .max();

        Some(latest.map_or(LastUpdate::Never, LastUpdate::At))
    }

    async fn image_engagements(&self, product: ProductId) -> Option<Vec<ImageEngagement>> {
        let engagements = self.engagements(product).await?;
        let mut images = Vec::new();
        for engagement in engagements {
            let EngagementKind::Image { image, .. } = self.naming.classify(&engagement.name) else {
                continue;
            };
            let Some(updated_on) = engagement.updated_on() else {
                warn!(engagement_id = %engagement.id, "skipping image engagement without update time");
                continue;
            };
            images.push(ImageEngagement {
                engagement_id: engagement.id,
                image_name: image,
                updated_on,
            });
        }
        Some(images)
    }

    async fn endpoint_id(&self, product: ProductId) -> Option<EndpointId> {
        let endpoints = self
            .list_all::<EndpointRef>(
                API_ENDPOINTS,
                &[
                    ("product", product.to_string()),
                    ("limit", LIST_LIMIT.to_string()),
                ],
            )
            .await?;
        if endpoints.is_empty() {
            error!(product_id = %product, "failed to get endpoint");
            return None;
        }

        let endpoint = endpoints
            .into_iter()
            .find(|e| e.protocol.is_some())
            .map(|e| e.id);
        if endpoint.is_none() {
            error!(product_id = %product, "no endpoint exposes a protocol");
        }
        endpoint
    }

    async fn submit_report(&self, report: &ReportUpload) -> Option<TestId> {
        match self.post_report(report).await {
            Ok(test_id) => {
                debug!(
                    engagement_id = %report.engagement_id,
                    report = %report.path.display(),
                    "report imported"
                );
                test_id
            }
            Err(e) => {
                error!(
                    engagement_id = %report.engagement_id,
                    report = %report.path.display(),
                    "report upload failed: {e}"
                );
                None
            }
        }
    }
}
