use async_trait::async_trait;
use chrono::NaiveDate;

use crate::Result;
use crate::types::{EngagementId, Image, NewImage, ProductId};

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Image>>;
    async fn insert_image(&self, image: &NewImage) -> Result<Image>;
    /// Removes every image row whose engagement id is listed, in one statement.
    /// Returns the number of deleted rows.
    async fn delete_by_engagements(&self, engagement_ids: &[EngagementId]) -> Result<u64>;
    async fn update_last_scan(
        &self,
        engagement_id: EngagementId,
        last_scan_at: NaiveDate,
    ) -> Result<()>;
    async fn page(&self, offset: i64, limit: i64) -> Result<Vec<Image>>;
}
