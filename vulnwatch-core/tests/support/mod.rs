//! In-memory fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use vulnwatch_core::database::{DastRepository, ImageRepository, ProjectRepository, Store};
use vulnwatch_core::notify::{NotificationEvent, Notifier};
use vulnwatch_core::scan::{CommandOutcome, CommandRunner, ShellRunner, SourceCheckout};
use vulnwatch_core::tracker::{FindingsTracker, ReportUpload};
use vulnwatch_core::types::*;
use vulnwatch_core::{MonitorError, Result};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    InsertProject(String),
    UpdateProject(i64, NaiveDate),
    InsertImage(EngagementId),
    DeleteImages(Vec<EngagementId>),
    UpdateImage(EngagementId, NaiveDate),
    InsertDast(ProductId),
    UpdateDast(i64, NaiveDate),
}

#[derive(Default)]
struct State {
    projects: Vec<Project>,
    images: Vec<Image>,
    dast: Vec<DastParams>,
    mutations: Vec<Mutation>,
}

/// Store double backed by vectors; records every mutation.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    next_id: AtomicI64,
    pub fail_pages: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn store(self: &Arc<Self>) -> Store {
        Store::new(self.clone(), self.clone(), self.clone())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn seed_project(&self, url: &str, product: i64, last_scan_at: NaiveDate) -> Project {
        let project = Project {
            id: self.next_id(),
            is_active: true,
            source_url: url.into(),
            source_branch: "main".into(),
            tracker_product_id: ProductId(product),
            last_scan_at,
            team: format!("team-{product}"),
        };
        self.state.lock().unwrap().projects.push(project.clone());
        project
    }

    pub fn seed_image(&self, product: i64, engagement: i64, url: &str, last_scan_at: NaiveDate) -> Image {
        let image = Image {
            id: self.next_id(),
            is_active: true,
            project_id: ProductId(product),
            image_url: url.into(),
            tracker_engagement_id: EngagementId(engagement),
            last_scan_at,
        };
        self.state.lock().unwrap().images.push(image.clone());
        image
    }

    pub fn set_project_active(&self, id: i64, active: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(project) = state.projects.iter_mut().find(|p| p.id == id) {
            project.is_active = active;
        }
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.lock().unwrap().projects.clone()
    }

    pub fn project(&self, product: i64) -> Project {
        self.projects()
            .into_iter()
            .find(|p| p.tracker_product_id == ProductId(product))
            .expect("project stored")
    }

    pub fn images(&self) -> Vec<Image> {
        self.state.lock().unwrap().images.clone()
    }

    pub fn image(&self, engagement: i64) -> Option<Image> {
        self.images()
            .into_iter()
            .find(|i| i.tracker_engagement_id == EngagementId(engagement))
    }

    pub fn engagement_ids(&self, product: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .images()
            .iter()
            .filter(|i| i.project_id == ProductId(product))
            .map(|i| i.tracker_engagement_id.get())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state.lock().unwrap().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.state.lock().unwrap().mutations.clear();
    }

    fn page_of<T: Clone>(items: &[T], offset: i64, limit: i64) -> Vec<T> {
        items
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }

    fn check_pages(&self) -> Result<()> {
        if self.fail_pages.load(Ordering::SeqCst) {
            return Err(MonitorError::Database("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<Project>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .projects
            .iter()
            .find(|p| p.source_url == source_url)
            .cloned())
    }

    async fn find_by_product_id(&self, product_id: ProductId) -> Result<Option<Project>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .projects
            .iter()
            .find(|p| p.tracker_product_id == product_id)
            .cloned())
    }

    async fn insert_project(&self, project: &NewProject) -> Result<Project> {
        let stored = Project {
            id: self.next_id(),
            is_active: true,
            source_url: project.source_url.clone(),
            source_branch: project.source_branch.clone(),
            tracker_product_id: project.tracker_product_id,
            last_scan_at: project.last_scan_at,
            team: project.team.clone(),
        };
        let mut state = self.state.lock().unwrap();
        state.projects.push(stored.clone());
        state
            .mutations
            .push(Mutation::InsertProject(project.source_url.clone()));
        Ok(stored)
    }

    async fn update_last_scan(&self, id: i64, last_scan_at: NaiveDate) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let project = state
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| MonitorError::NotFound(format!("project {id}")))?;
        project.last_scan_at = last_scan_at;
        state.mutations.push(Mutation::UpdateProject(id, last_scan_at));
        Ok(())
    }

    async fn page(&self, offset: i64, limit: i64) -> Result<Vec<Project>> {
        self.check_pages()?;
        Ok(Self::page_of(&self.state.lock().unwrap().projects, offset, limit))
    }
}

#[async_trait]
impl ImageRepository for MemoryStore {
    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Image>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .images
            .iter()
            .filter(|i| i.project_id == product_id)
            .cloned()
            .collect())
    }

    async fn insert_image(&self, image: &NewImage) -> Result<Image> {
        let stored = Image {
            id: self.next_id(),
            is_active: true,
            project_id: image.project_id,
            image_url: image.image_url.clone(),
            tracker_engagement_id: image.tracker_engagement_id,
            last_scan_at: image.last_scan_at,
        };
        let mut state = self.state.lock().unwrap();
        if state
            .images
            .iter()
            .any(|i| i.tracker_engagement_id == image.tracker_engagement_id)
        {
            return Err(MonitorError::Database("duplicate engagement_id".into()));
        }
        state.images.push(stored.clone());
        state
            .mutations
            .push(Mutation::InsertImage(image.tracker_engagement_id));
        Ok(stored)
    }

    async fn delete_by_engagements(&self, engagement_ids: &[EngagementId]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.images.len();
        state
            .images
            .retain(|i| !engagement_ids.contains(&i.tracker_engagement_id));
        let removed = (before - state.images.len()) as u64;
        state
            .mutations
            .push(Mutation::DeleteImages(engagement_ids.to_vec()));
        Ok(removed)
    }

    async fn update_last_scan(
        &self,
        engagement_id: EngagementId,
        last_scan_at: NaiveDate,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let image = state
            .images
            .iter_mut()
            .find(|i| i.tracker_engagement_id == engagement_id)
            .ok_or_else(|| MonitorError::NotFound(format!("image {engagement_id}")))?;
        image.last_scan_at = last_scan_at;
        state
            .mutations
            .push(Mutation::UpdateImage(engagement_id, last_scan_at));
        Ok(())
    }

    async fn page(&self, offset: i64, limit: i64) -> Result<Vec<Image>> {
        self.check_pages()?;
        Ok(Self::page_of(&self.state.lock().unwrap().images, offset, limit))
    }
}

#[async_trait]
impl DastRepository for MemoryStore {
    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<DastParams>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .dast
            .iter()
            .filter(|d| d.project_id == product_id)
            .cloned()
            .collect())
    }

    async fn insert_params(&self, params: &NewDastParams) -> Result<DastParams> {
        let stored = DastParams {
            id: self.next_id(),
            project_id: params.project_id,
            params: params.params.clone(),
            last_scan_at: params.last_scan_at,
        };
        let mut state = self.state.lock().unwrap();
        state.dast.push(stored.clone());
        state.mutations.push(Mutation::InsertDast(params.project_id));
        Ok(stored)
    }

    async fn update_last_scan(&self, id: i64, last_scan_at: NaiveDate) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state.dast.iter_mut().find(|d| d.id == id) {
            row.last_scan_at = last_scan_at;
        }
        state.mutations.push(Mutation::UpdateDast(id, last_scan_at));
        Ok(())
    }
}

/// Tracker double with per-product canned answers.
#[derive(Default)]
pub struct StubTracker {
    pub products: Mutex<HashMap<String, ProductId>>,
    /// Missing entries answer `LastUpdate::Never`; `None` values are unavailable.
    pub last_updates: Mutex<HashMap<ProductId, Option<LastUpdate>>>,
    /// Missing entries answer an empty listing; `None` values are unavailable.
    pub image_engagements: Mutex<HashMap<ProductId, Option<Vec<ImageEngagement>>>>,
    pub endpoints: Mutex<HashMap<ProductId, EndpointId>>,
    pub branch_engagements: Mutex<HashMap<(ProductId, String), EngagementId>>,
    pub findings: Mutex<HashMap<ProductId, FindingsCount>>,
    pub uploads: Mutex<Vec<ReportUpload>>,
    pub rejected_reports: Mutex<HashSet<String>>,
}

impl StubTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_product(&self, name: &str, product: i64) {
        self.products
            .lock()
            .unwrap()
            .insert(name.into(), ProductId(product));
    }

    pub fn with_last_update(&self, product: i64, update: Option<LastUpdate>) {
        self.last_updates
            .lock()
            .unwrap()
            .insert(ProductId(product), update);
    }

    pub fn with_images(&self, product: i64, images: Option<&[(i64, &str, NaiveDate)]>) {
        let images = images.map(|list| {
            list.iter()
                .map(|(id, name, updated_on)| ImageEngagement {
                    engagement_id: EngagementId(*id),
                    image_name: name.to_string(),
                    updated_on: *updated_on,
                })
                .collect()
        });
        self.image_engagements
            .lock()
            .unwrap()
            .insert(ProductId(product), images);
    }

    /// Endpoint, branch engagement and findings count for a scannable product.
    pub fn with_upload_target(&self, product: i64, branch: &str, findings: u64) {
        let product_id = ProductId(product);
        self.endpoints
            .lock()
            .unwrap()
            .insert(product_id, EndpointId(product * 10));
        self.branch_engagements
            .lock()
            .unwrap()
            .insert((product_id, branch.into()), EngagementId(product * 100));
        self.findings
            .lock()
            .unwrap()
            .insert(product_id, FindingsCount::Count(findings));
    }

    pub fn uploads(&self) -> Vec<ReportUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl FindingsTracker for StubTracker {
    async fn find_product(&self, name: &str) -> Option<ProductId> {
        self.products.lock().unwrap().get(name).copied()
    }

    async fn product_findings(&self, product: ProductId) -> FindingsCount {
        self.findings
            .lock()
            .unwrap()
            .get(&product)
            .copied()
            .unwrap_or(FindingsCount::Unavailable)
    }

    async fn engagement_for_branch(
        &self,
        product: ProductId,
        branch: &str,
    ) -> Option<EngagementId> {
        self.branch_engagements
            .lock()
            .unwrap()
            .get(&(product, branch.to_string()))
            .copied()
    }

    async fn last_engagement_update(
        &self,
        product: ProductId,
        _scope: EngagementScope,
    ) -> Option<LastUpdate> {
        self.last_updates
            .lock()
            .unwrap()
            .get(&product)
            .copied()
            .unwrap_or(Some(LastUpdate::Never))
    }

    async fn image_engagements(&self, product: ProductId) -> Option<Vec<ImageEngagement>> {
        self.image_engagements
            .lock()
            .unwrap()
            .get(&product)
            .cloned()
            .unwrap_or(Some(Vec::new()))
    }

    async fn endpoint_id(&self, product: ProductId) -> Option<EndpointId> {
        self.endpoints.lock().unwrap().get(&product).copied()
    }

    async fn submit_report(&self, report: &ReportUpload) -> Option<TestId> {
        let body = tokio::fs::read_to_string(&report.path).await.ok()?;
        let rejected = self.rejected_reports.lock().unwrap().contains(&body);
        if rejected {
            return None;
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(report.clone());
        Some(TestId(uploads.len() as i64))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Creates the destination directory instead of cloning; fails for chosen
/// repositories.
#[derive(Default)]
pub struct StubCheckout {
    pub failing: Mutex<HashSet<String>>,
    pub checkouts: Mutex<Vec<String>>,
}

impl StubCheckout {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, source_url: &str) {
        self.failing.lock().unwrap().insert(source_url.into());
    }
}

#[async_trait]
impl SourceCheckout for StubCheckout {
    async fn checkout(&self, source_url: &str, _branch: &str, dest: &Path) -> Result<()> {
        self.checkouts.lock().unwrap().push(source_url.into());
        let failing = self.failing.lock().unwrap().contains(source_url);
        if failing {
            return Err(MonitorError::Internal(format!("clone of {source_url} failed")));
        }
        tokio::fs::create_dir_all(dest).await?;
        tokio::fs::write(dest.join("README.md"), b"checkout").await?;
        Ok(())
    }
}

/// Drops the `docker login ... &&` prefix and runs the scanner part in a
/// real shell.
#[derive(Default)]
pub struct LoginStrippingRunner {
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for LoginStrippingRunner {
    async fn run(&self, command: &str) -> CommandOutcome {
        self.seen.lock().unwrap().push(command.to_string());
        let scan = command
            .split_once(" && ")
            .map_or(command, |(_, scan)| scan);
        ShellRunner.run(scan).await
    }
}
