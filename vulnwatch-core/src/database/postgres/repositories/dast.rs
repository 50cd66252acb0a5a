use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::database::ports::dast::DastRepository;
use crate::database::schema::Table;
use crate::types::{DastParams, NewDastParams, ProductId};
use crate::{MonitorError, Result};

#[derive(Debug, sqlx::FromRow)]
struct DastRow {
    id: i64,
    project_id: i64,
    params: String,
    last_scan_at: NaiveDate,
}

impl From<DastRow> for DastParams {
    fn from(row: DastRow) -> Self {
        DastParams {
            id: row.id,
            project_id: ProductId(row.project_id),
            params: row.params,
            last_scan_at: row.last_scan_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostgresDastRepository {
    pool: PgPool,
}

impl PostgresDastRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DastRepository for PostgresDastRepository {
    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<DastParams>> {
        let mut builder = Table::Dast.select();
        builder.push(" WHERE project_id = ");
        builder.push_bind(product_id.get());
        builder.push(" ORDER BY id");

        let rows = builder
            .build_query_as::<DastRow>()
            .fetch_all(self.pool())
            .await
            .map_err(|e| MonitorError::Database(format!("Failed to list dast params: {e}")))?;

        Ok(rows.into_iter().map(DastParams::from).collect())
    }

    async fn insert_params(&self, params: &NewDastParams) -> Result<DastParams> {
        let row = sqlx::query_as::<_, DastRow>(
            r#"
            INSERT INTO dast (project_id, params, last_scan_at)
            VALUES ($1, $2, $3)
            RETURNING id, project_id, params, last_scan_at
            "#,
        )
        .bind(params.project_id.get())
        .bind(&params.params)
        .bind(params.last_scan_at)
        .fetch_one(self.pool())
        .await
        .map_err(|e| MonitorError::Database(format!("Failed to insert dast params: {e}")))?;

        Ok(row.into())
    }

    async fn update_last_scan(&self, id: i64, last_scan_at: NaiveDate) -> Result<()> {
        sqlx::query("UPDATE dast SET last_scan_at = $1 WHERE id = $2")
            .bind(last_scan_at)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                MonitorError::Database(format!("Failed to update dast last scan: {e}"))
            })?;
        Ok(())
    }
}
