//! Persistence: typed schema, repository ports, and the PostgreSQL adapter.

pub mod ports;
pub mod postgres;
pub mod schema;

use std::fmt;
use std::sync::Arc;

pub use ports::dast::DastRepository;
pub use ports::images::ImageRepository;
pub use ports::projects::ProjectRepository;
pub use postgres::PostgresDatabase;
pub use schema::{ColumnDef, Table};

/// Repository handles shared by the engine and the orchestrator.
///
/// Cloning is cheap; every clone points at the same underlying adapters.
#[derive(Clone)]
pub struct Store {
    pub projects: Arc<dyn ProjectRepository>,
    pub images: Arc<dyn ImageRepository>,
    pub dast: Arc<dyn DastRepository>,
}

impl Store {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        images: Arc<dyn ImageRepository>,
        dast: Arc<dyn DastRepository>,
    ) -> Self {
        Self {
            projects,
            images,
            dast,
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("projects_ptr", &Arc::as_ptr(&self.projects))
            .field("images_ptr", &Arc::as_ptr(&self.images))
            .field("dast_ptr", &Arc::as_ptr(&self.dast))
            .finish()
    }
}
