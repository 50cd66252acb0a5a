//! PostgreSQL adapters implementing the repository ports.

pub mod repositories;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::database::Store;
use crate::database::schema::Table;
use crate::{MIGRATOR, MonitorError, Result};

pub use repositories::dast::PostgresDastRepository;
pub use repositories::images::PostgresImageRepository;
pub use repositories::projects::PostgresProjectRepository;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Owns the connection pool for one process run.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresDatabase {
    pub async fn connect(
        connection_string: &str,
        max_connections: Option<u32>,
    ) -> Result<Self> {
        let max_connections = max_connections
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(connection_string)
            .await
            .map_err(|e| {
                MonitorError::Database(format!("Database connection failed: {e}"))
            })?;

        info!(max_connections, "database pool initialized");

        Ok(Self {
            pool,
            max_connections,
        })
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    /// Drops the three tables. Migration bookkeeping is dropped as well so a
    /// later `migrate` recreates them.
    pub async fn drop_tables(&self) -> Result<()> {
        for table in Table::ALL {
            sqlx::query(&table.drop_statement())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    MonitorError::Database(format!(
                        "Failed to drop table {}: {e}",
                        table.name()
                    ))
                })?;
            info!(table = table.name(), "dropped table");
        }

        if let Err(e) = sqlx::query("DROP TABLE IF EXISTS _sqlx_migrations")
            .execute(&self.pool)
            .await
        {
            warn!("failed to drop migration history: {e}");
        }
        Ok(())
    }

    pub fn store(&self) -> Store {
        Store::new(
            Arc::new(PostgresProjectRepository::new(self.pool.clone())),
            Arc::new(PostgresImageRepository::new(self.pool.clone())),
            Arc::new(PostgresDastRepository::new(self.pool.clone())),
        )
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}
