use async_trait::async_trait;
use chrono::NaiveDate;

use crate::Result;
use crate::types::{NewProject, ProductId, Project};

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<Project>>;
    async fn find_by_product_id(&self, product_id: ProductId) -> Result<Option<Project>>;
    async fn insert_project(&self, project: &NewProject) -> Result<Project>;
    async fn update_last_scan(&self, id: i64, last_scan_at: NaiveDate) -> Result<()>;
    /// One page of projects ordered by primary key.
    async fn page(&self, offset: i64, limit: i64) -> Result<Vec<Project>>;
}
