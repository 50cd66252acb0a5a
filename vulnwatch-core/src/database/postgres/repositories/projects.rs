use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::database::ports::projects::ProjectRepository;
use crate::database::schema::Table;
use crate::types::{NewProject, ProductId, Project};
use crate::{MonitorError, Result};

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    is_active: bool,
    gitlab_url: String,
    gitlab_branch: String,
    dd_project_id: i64,
    last_scan_at: NaiveDate,
    team: String,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            is_active: row.is_active,
            source_url: row.gitlab_url,
            source_branch: row.gitlab_branch,
            tracker_product_id: ProductId(row.dd_project_id),
            last_scan_at: row.last_scan_at,
            team: row.team,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostgresProjectRepository {
    pool: PgPool,
}

impl PostgresProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_one(&self, column: &'static str, value: FindKey<'_>) -> Result<Option<Project>> {
        debug_assert!(Table::Projects.has_column(column));
        let mut builder = Table::Projects.select();
        builder.push(" WHERE ");
        builder.push(column);
        builder.push(" = ");
        match value {
            FindKey::Text(v) => builder.push_bind(v.to_string()),
            FindKey::Int(v) => builder.push_bind(v),
        };
        builder.push(" LIMIT 1");

        let row = builder
            .build_query_as::<ProjectRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                MonitorError::Database(format!("Failed to load project by {column}: {e}"))
            })?;
        Ok(row.map(Project::from))
    }
}

enum FindKey<'a> {
    Text(&'a str),
    Int(i64),
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<Project>> {
        self.find_one("gitlab_url", FindKey::Text(source_url)).await
    }

    async fn find_by_product_id(&self, product_id: ProductId) -> Result<Option<Project>> {
        self.find_one("dd_project_id", FindKey::Int(product_id.get()))
            .await
    }

    async fn insert_project(&self, project: &NewProject) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects (is_active, gitlab_url, gitlab_branch, dd_project_id, last_scan_at, team)
            VALUES (TRUE, $1, $2, $3, $4, $5)
            RETURNING id, is_active, gitlab_url, gitlab_branch, dd_project_id, last_scan_at, team
            "#,
        )
        .bind(&project.source_url)
        .bind(&project.source_branch)
        .bind(project.tracker_product_id.get())
        .bind(project.last_scan_at)
        .bind(&project.team)
        .fetch_one(self.pool())
        .await
        .map_err(|e| MonitorError::Database(format!("Failed to insert project: {e}")))?;

        Ok(row.into())
    }

    async fn update_last_scan(&self, id: i64, last_scan_at: NaiveDate) -> Result<()> {
        let result = sqlx::query("UPDATE projects SET last_scan_at = $1 WHERE id = $2")
            .bind(last_scan_at)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                MonitorError::Database(format!("Failed to update project last scan: {e}"))
            })?;

        if result.rows_affected() == 0 {
            return Err(MonitorError::NotFound(format!("project {id}")));
        }
        Ok(())
    }

    async fn page(&self, offset: i64, limit: i64) -> Result<Vec<Project>> {
        let rows = Table::Projects
            .select_page(offset, limit)
            .build_query_as::<ProjectRow>()
            .fetch_all(self.pool())
            .await
            .map_err(|e| MonitorError::Database(format!("Failed to page projects: {e}")))?;

        Ok(rows.into_iter().map(Project::from).collect())
    }
}
