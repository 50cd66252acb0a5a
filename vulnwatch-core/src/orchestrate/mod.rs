//! Paginated scan pipelines over stored projects and images.
//!
//! Each pipeline pages through its table in primary-key order. All entities
//! of a page run concurrently and the next page is fetched only after every
//! one of them finished. Entity failures are logged and counted; they never
//! stop the page or the pipeline.

pub mod eligibility;
pub mod image;
pub mod outcome;
pub mod project;
pub mod upload;

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};

use crate::Result;
use crate::database::Store;
use crate::notify::Notifier;
use crate::registry::{RegistryCatalog, TagResolver};
use crate::scan::{ScanRunner, ScanWorkspace, SourceCheckout};
use crate::scanners::ScannerRegistry;
use crate::tracker::FindingsTracker;
use crate::types::NamingRules;

pub use eligibility::{Clock, FixedClock, SystemClock, is_due};
pub use outcome::{EntityOutcome, PipelineStats, SkipReason};

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Branch label for image report imports; existing tracker data uses this
/// exact spelling.
pub const IMAGE_BRANCH_LABEL: &str = "continouous-monitoring-images";

/// Collaborators of one orchestrator.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub store: Store,
    pub tracker: Arc<dyn FindingsTracker>,
    pub scanners: Arc<ScannerRegistry>,
    pub checkout: Arc<dyn SourceCheckout>,
    pub runner: ScanRunner,
    pub resolver: TagResolver,
    pub registries: Arc<RegistryCatalog>,
    pub notifier: Arc<dyn Notifier>,
    pub workspace: ScanWorkspace,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for OrchestratorDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorDeps")
            .field("scanners", &self.scanners)
            .field("runner", &self.runner)
            .field("resolver", &self.resolver)
            .field("registries", &self.registries)
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub page_size: usize,
    pub naming: NamingRules,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            naming: NamingRules::default(),
        }
    }
}

pub struct ScanOrchestrator {
    deps: OrchestratorDeps,
    settings: OrchestratorSettings,
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("settings", &self.settings)
            .field("deps", &self.deps)
            .finish()
    }
}

impl ScanOrchestrator {
    pub fn new(deps: OrchestratorDeps, settings: OrchestratorSettings) -> Self {
        Self { deps, settings }
    }

    fn page_size(&self) -> i64 {
        self.settings.page_size.max(1) as i64
    }

    pub async fn run_projects(&self) -> PipelineStats {
        let stats = self
            .drain_pages(
                "projects",
                |offset, limit| self.deps.store.projects.page(offset, limit),
                |project| self.process_project(project),
            )
            .await;
        info!(?stats, "project pipeline finished");
        stats
    }

    pub async fn run_images(&self) -> PipelineStats {
        let stats = self
            .drain_pages(
                "images",
                |offset, limit| self.deps.store.images.page(offset, limit),
                |image| self.process_image(image),
            )
            .await;
        info!(?stats, "image pipeline finished");
        stats
    }

    /// Fetches pages until an empty one, running each page as one barrier.
    async fn drain_pages<T, Fetch, FetchFut, Work, WorkFut>(
        &self,
        table: &'static str,
        fetch: Fetch,
        work: Work,
    ) -> PipelineStats
    where
        Fetch: Fn(i64, i64) -> FetchFut,
        FetchFut: Future<Output = Result<Vec<T>>>,
        Work: Fn(T) -> WorkFut,
        WorkFut: Future<Output = EntityOutcome>,
    {
        let limit = self.page_size();
        let mut offset = 0;
        let mut stats = PipelineStats::default();

        loop {
            let page = match fetch(offset, limit).await {
                Ok(page) => page,
                Err(e) => {
                    error!(table, offset, limit, "failed to fetch page: {e}");
                    stats.aborted = true;
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            stats.pages += 1;
            for outcome in join_all(page.into_iter().map(&work)).await {
                stats.record(&outcome);
            }
            offset += limit;
        }
        stats
    }
}
