use async_trait::async_trait;
use chrono::NaiveDate;

use crate::Result;
use crate::types::{DastParams, NewDastParams, ProductId};

#[async_trait]
pub trait DastRepository: Send + Sync {
    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<DastParams>>;
    async fn insert_params(&self, params: &NewDastParams) -> Result<DastParams>;
    async fn update_last_scan(&self, id: i64, last_scan_at: NaiveDate) -> Result<()>;
}
