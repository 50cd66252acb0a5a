use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::diff::{ReconcileCase, ReconcilePlan};
use crate::Result;
use crate::database::Store;
use crate::tracker::FindingsTracker;
use crate::types::{
    EngagementId, EngagementScope, Image, ImageEngagement, LastUpdate, NewImage, NewProject,
    ProductId, Project, ProjectDescriptor,
};

/// What happened to one descriptor during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSync {
    Bootstrapped { product: ProductId, images: usize },
    Reconciled { product: ProductId, case: ReconcileCase },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub bootstrapped: usize,
    pub reconciled: usize,
    pub skipped: usize,
}

/// Brings stored projects and images in line with the tracker.
///
/// For each project every tracker and store read happens before the first
/// write, so a project that fails mid-way leaves the store untouched.
#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Store,
    tracker: Arc<dyn FindingsTracker>,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

fn skipped(reason: impl Into<String>) -> ProjectSync {
    ProjectSync::Skipped {
        reason: reason.into(),
    }
}

impl ReconciliationEngine {
    pub fn new(store: Store, tracker: Arc<dyn FindingsTracker>) -> Self {
        Self { store, tracker }
    }

    pub async fn sync_projects(&self, descriptors: &[ProjectDescriptor]) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for descriptor in descriptors {
            let outcome = match self.sync_project(descriptor).await {
                Ok(outcome) => outcome,
                Err(e) => skipped(format!("store error: {e}")),
            };

            match &outcome {
                ProjectSync::Bootstrapped { product, images } => {
                    summary.bootstrapped += 1;
                    info!(product_id = %product, images, project = %descriptor.gitlab_url, "project added");
                }
                ProjectSync::Reconciled { product, case } => {
                    summary.reconciled += 1;
                    info!(product_id = %product, ?case, "project synced");
                }
                ProjectSync::Skipped { reason } => {
                    summary.skipped += 1;
                    error!(project = %descriptor.gitlab_url, reason = %reason, "project sync aborted");
                }
            }
        }
        summary
    }

    pub async fn sync_project(&self, descriptor: &ProjectDescriptor) -> Result<ProjectSync> {
        match self
            .store
            .projects
            .find_by_source_url(&descriptor.gitlab_url)
            .await?
        {
            Some(project) => self.reconcile_known(&project).await,
            None => self.bootstrap(descriptor).await,
        }
    }

    async fn bootstrap(&self, descriptor: &ProjectDescriptor) -> Result<ProjectSync> {
        info!(project = %descriptor.gitlab_url, "adding new project");

        let Some(product) = self.tracker.find_product(&descriptor.gitlab_url).await else {
            return Ok(skipped("tracker product not found"));
        };
        let Some(last_update) = self
            .tracker
            .last_engagement_update(product, EngagementScope::Project)
            .await
        else {
            return Ok(skipped("tracker engagements unavailable"));
        };
        let Some(engagements) = self.tracker.image_engagements(product).await else {
            return Ok(skipped("tracker image engagements unavailable"));
        };

        let last_scan_at = match last_update {
            LastUpdate::At(day) => day,
            // 1970-01-01: due on the first run
            LastUpdate::Never => NaiveDate::default(),
        };

        self.store
            .projects
            .insert_project(&NewProject {
                source_url: descriptor.gitlab_url.clone(),
                source_branch: descriptor.gitlab_branch.clone(),
                tracker_product_id: product,
                last_scan_at,
                team: descriptor.team.clone(),
            })
            .await?;

        let engagements = dedup_engagements(engagements);
        for engagement in engagements.values() {
            info!(product_id = %product, image = %engagement.image_name, "adding image");
            self.store
                .images
                .insert_image(&new_image(product, engagement))
                .await?;
        }

        Ok(ProjectSync::Bootstrapped {
            product,
            images: engagements.len(),
        })
    }

    async fn reconcile_known(&self, project: &Project) -> Result<ProjectSync> {
        let product = project.tracker_product_id;

        let Some(last_update) = self
            .tracker
            .last_engagement_update(product, EngagementScope::Project)
            .await
        else {
            return Ok(skipped("tracker engagements unavailable"));
        };
        let Some(engagements) = self.tracker.image_engagements(product).await else {
            return Ok(skipped("tracker image engagements unavailable"));
        };
        let stored = self.store.images.list_for_product(product).await?;

        if let LastUpdate::At(day) = last_update
            && day > project.last_scan_at
        {
            info!(product_id = %product, %day, "pulling project last scan forward");
            self.store.projects.update_last_scan(project.id, day).await?;
        }

        let case = self.reconcile_images(product, engagements, &stored).await?;
        Ok(ProjectSync::Reconciled { product, case })
    }

    async fn reconcile_images(
        &self,
        product: ProductId,
        engagements: Vec<ImageEngagement>,
        stored: &[Image],
    ) -> Result<ReconcileCase> {
        let tracker = dedup_engagements(engagements);
        let local: BTreeMap<EngagementId, &Image> = stored
            .iter()
            .map(|image| (image.tracker_engagement_id, image))
            .collect();

        let tracker_ids: BTreeSet<EngagementId> = tracker.keys().copied().collect();
        let local_ids: BTreeSet<EngagementId> = local.keys().copied().collect();
        let plan = ReconcilePlan::compute(&tracker_ids, &local_ids);

        if !plan.delete.is_empty() {
            info!(product_id = %product, deleted = ?plan.delete, "removing images gone from tracker");
            let removed = self.store.images.delete_by_engagements(&plan.delete).await?;
            if removed != plan.delete.len() as u64 {
                warn!(product_id = %product, removed, expected = plan.delete.len(), "image delete count mismatch");
            }
        }

        for id in &plan.insert {
            if let Some(engagement) = tracker.get(id) {
                info!(product_id = %product, image = %engagement.image_name, "adding image");
                self.store
                    .images
                    .insert_image(&new_image(product, engagement))
                    .await?;
            }
        }

        for id in &plan.common {
            let (Some(engagement), Some(image)) = (tracker.get(id), local.get(id)) else {
                continue;
            };
            if engagement.updated_on > image.last_scan_at {
                info!(engagement_id = %id, image = %image.image_url, "pulling image last scan forward");
                self.store
                    .images
                    .update_last_scan(*id, engagement.updated_on)
                    .await?;
            }
        }

        Ok(plan.case)
    }
}

fn new_image(product: ProductId, engagement: &ImageEngagement) -> NewImage {
    NewImage {
        project_id: product,
        image_url: engagement.image_name.clone(),
        tracker_engagement_id: engagement.engagement_id,
        last_scan_at: engagement.updated_on,
    }
}

/// Keys engagements by id; a repeated id keeps its newest timestamp.
fn dedup_engagements(
    engagements: Vec<ImageEngagement>,
) -> BTreeMap<EngagementId, ImageEngagement> {
    let mut by_id: BTreeMap<EngagementId, ImageEngagement> = BTreeMap::new();
    for engagement in engagements {
        match by_id.get(&engagement.engagement_id) {
            Some(existing) if existing.updated_on >= engagement.updated_on => {}
            _ => {
                by_id.insert(engagement.engagement_id, engagement);
            }
        }
    }
    by_id
}
