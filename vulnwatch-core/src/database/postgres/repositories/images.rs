use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::database::ports::images::ImageRepository;
use crate::database::schema::Table;
use crate::types::{EngagementId, Image, NewImage, ProductId};
use crate::{MonitorError, Result};

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i64,
    is_active: bool,
    project_id: i64,
    image_url: String,
    engagement_id: i64,
    last_scan_at: NaiveDate,
}

impl From<ImageRow> for Image {
    fn from(row: ImageRow) -> Self {
        Image {
            id: row.id,
            is_active: row.is_active,
            project_id: ProductId(row.project_id),
            image_url: row.image_url,
            tracker_engagement_id: EngagementId(row.engagement_id),
            last_scan_at: row.last_scan_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostgresImageRepository {
    pool: PgPool,
}

impl PostgresImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ImageRepository for PostgresImageRepository {
    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Image>> {
        let mut builder = Table::Images.select();
        builder.push(" WHERE project_id = ");
        builder.push_bind(product_id.get());
        builder.push(" ORDER BY id");

        let rows = builder
            .build_query_as::<ImageRow>()
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                MonitorError::Database(format!(
                    "Failed to list images for product {product_id}: {e}"
                ))
            })?;

        Ok(rows.into_iter().map(Image::from).collect())
    }

    async fn insert_image(&self, image: &NewImage) -> Result<Image> {
        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            INSERT INTO images (is_active, project_id, image_url, engagement_id, last_scan_at)
            VALUES (TRUE, $1, $2, $3, $4)
            RETURNING id, is_active, project_id, image_url, engagement_id, last_scan_at
            "#,
        )
        .bind(image.project_id.get())
        .bind(&image.image_url)
        .bind(image.tracker_engagement_id.get())
        .bind(image.last_scan_at)
        .fetch_one(self.pool())
        .await
        .map_err(|e| MonitorError::Database(format!("Failed to insert image: {e}")))?;

        Ok(row.into())
    }

    async fn delete_by_engagements(&self, engagement_ids: &[EngagementId]) -> Result<u64> {
        if engagement_ids.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = engagement_ids.iter().map(|id| id.get()).collect();
        let result = sqlx::query("DELETE FROM images WHERE engagement_id = ANY($1)")
            .bind(&ids)
            .execute(self.pool())
            .await
            .map_err(|e| MonitorError::Database(format!("Failed to delete images: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn update_last_scan(
        &self,
        engagement_id: EngagementId,
        last_scan_at: NaiveDate,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE images SET last_scan_at = $1 WHERE engagement_id = $2")
                .bind(last_scan_at)
                .bind(engagement_id.get())
                .execute(self.pool())
                .await
                .map_err(|e| {
                    MonitorError::Database(format!("Failed to update image last scan: {e}"))
                })?;

        if result.rows_affected() == 0 {
            return Err(MonitorError::NotFound(format!(
                "image with engagement {engagement_id}"
            )));
        }
        Ok(())
    }

    async fn page(&self, offset: i64, limit: i64) -> Result<Vec<Image>> {
        let rows = Table::Images
            .select_page(offset, limit)
            .build_query_as::<ImageRow>()
            .fetch_all(self.pool())
            .await
            .map_err(|e| MonitorError::Database(format!("Failed to page images: {e}")))?;

        Ok(rows.into_iter().map(Image::from).collect())
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use super::*;

    fn new_image(product: i64, engagement: i64) -> NewImage {
        NewImage {
            project_id: ProductId(product),
            image_url: format!("registry.local/team/app{engagement}"),
            tracker_engagement_id: EngagementId(engagement),
            last_scan_at: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        }
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn delete_removes_only_listed_engagements(pool: PgPool) {
        let repo = PostgresImageRepository::new(pool);
        for engagement in [10, 11, 12] {
            repo.insert_image(&new_image(1, engagement)).await.unwrap();
        }
        repo.insert_image(&new_image(2, 20)).await.unwrap();

        let deleted = repo
            .delete_by_engagements(&[EngagementId(10), EngagementId(12)])
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let remaining: Vec<_> = repo
            .list_for_product(ProductId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|image| image.tracker_engagement_id)
            .collect();
        assert_eq!(remaining, vec![EngagementId(11)]);
        assert_eq!(repo.delete_by_engagements(&[]).await.unwrap(), 0);
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn update_last_scan_keys_on_engagement(pool: PgPool) {
        let repo = PostgresImageRepository::new(pool);
        repo.insert_image(&new_image(1, 30)).await.unwrap();

        let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        repo.update_last_scan(EngagementId(30), june).await.unwrap();
        let page = repo.page(0, 5).await.unwrap();
        assert_eq!(page[0].last_scan_at, june);

        let missing = repo.update_last_scan(EngagementId(31), june).await;
        assert!(matches!(missing, Err(MonitorError::NotFound(_))));
    }
}
