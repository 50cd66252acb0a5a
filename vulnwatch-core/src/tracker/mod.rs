//! Findings-tracker gateway.
//!
//! Every operation collapses transport failures, non-success statuses and
//! empty result sets into an explicit "unavailable" value after logging them.
//! Callers skip the current entity on such a value and carry on with the batch.

pub mod defectdojo;
pub mod report;

use async_trait::async_trait;

use crate::types::{
    EndpointId, EngagementId, EngagementScope, FindingsCount, ImageEngagement, LastUpdate,
    ProductId, TestId,
};

pub use defectdojo::DefectDojoClient;
pub use report::ReportUpload;

#[async_trait]
pub trait FindingsTracker: Send + Sync {
    async fn find_product(&self, name: &str) -> Option<ProductId>;

    async fn product_findings(&self, product: ProductId) -> FindingsCount;

    /// Engagement whose branch tag equals `branch`.
    async fn engagement_for_branch(
        &self,
        product: ProductId,
        branch: &str,
    ) -> Option<EngagementId>;

    /// Most recent update across engagements matching `scope`. `None` means
    /// the listing itself was unavailable.
    async fn last_engagement_update(
        &self,
        product: ProductId,
        scope: EngagementScope,
    ) -> Option<LastUpdate>;

    /// Image-scoped engagements of a product. `Some(vec![])` is a successful
    /// listing with no image engagements.
    async fn image_engagements(&self, product: ProductId) -> Option<Vec<ImageEngagement>>;

    /// First endpoint of the product that exposes a protocol.
    async fn endpoint_id(&self, product: ProductId) -> Option<EndpointId>;

    async fn submit_report(&self, report: &ReportUpload) -> Option<TestId>;
}
