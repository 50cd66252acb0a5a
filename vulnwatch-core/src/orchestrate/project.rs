use std::path::Path;

use tracing::{error, info, warn};

use super::upload::{UploadTarget, upload_reports};
use super::{EntityOutcome, ScanOrchestrator, SkipReason, is_due};
use crate::notify::NotificationEvent;
use crate::scan::clean_dir;
use crate::types::{FindingsCount, Project};

impl ScanOrchestrator {
    pub(crate) async fn process_project(&self, project: Project) -> EntityOutcome {
        let product = project.tracker_product_id;
        info!(product_id = %product, project = %project.source_url, "processing project");

        if !project.is_active {
            info!(product_id = %product, "skipping inactive project");
            return EntityOutcome::Skipped(SkipReason::Inactive);
        }
        let today = self.deps.clock.today();
        if !is_due(project.last_scan_at, today) {
            info!(product_id = %product, last_scan_at = %project.last_scan_at, "skipping project scheduled in the future");
            return EntityOutcome::Skipped(SkipReason::NotDue);
        }

        let scanners = self.deps.scanners.project_scanners();
        if scanners.is_empty() {
            info!(product_id = %product, "no project scanners configured");
            return EntityOutcome::NoReports;
        }

        let workspace = &self.deps.workspace;
        let project_dir = workspace.project_dir(product);
        let reports_dir = workspace.project_reports_dir(product);

        if let Err(e) = self
            .deps
            .checkout
            .checkout(&project.source_url, &project.source_branch, &project_dir)
            .await
        {
            error!(product_id = %product, "failed to clone: {e}");
            discard(&project_dir).await;
            return EntityOutcome::Failed(format!("checkout failed: {e}"));
        }
        if let Err(e) = workspace.prepare(&reports_dir).await {
            error!(product_id = %product, "failed to prepare reports directory: {e}");
            discard(&project_dir).await;
            return EntityOutcome::Failed(format!("reports directory: {e}"));
        }

        info!(product_id = %product, scanners = scanners.len(), "scanning");
        self.deps
            .runner
            .scan_project(product, scanners, &project_dir, &reports_dir)
            .await;
        discard(&project_dir).await;

        let reports = match workspace.list_reports(&reports_dir, scanners.len()).await {
            Ok(reports) => reports,
            Err(e) => {
                error!(product_id = %product, "failed to list reports: {e}");
                discard(&reports_dir).await;
                return EntityOutcome::Failed(format!("report listing: {e}"));
            }
        };
        if reports.is_empty() {
            info!(product_id = %product, "no reports to upload");
            discard(&reports_dir).await;
            return EntityOutcome::NoReports;
        }

        let endpoint = self.deps.tracker.endpoint_id(product).await;
        let engagement = self
            .deps
            .tracker
            .engagement_for_branch(product, &project.source_branch)
            .await;
        let uploaded = match (endpoint, engagement) {
            (Some(endpoint_id), Some(engagement_id)) => {
                let target = UploadTarget {
                    product,
                    endpoint_id,
                    engagement_id,
                    branch_tag: &project.source_branch,
                    test_title: None,
                    scan_date: today,
                };
                upload_reports(self.deps.tracker.as_ref(), scanners, &reports, &target).await
            }
            (endpoint, engagement) => {
                error!(product_id = %product, ?endpoint, ?engagement, "failed to send project reports");
                0
            }
        };
        discard(&reports_dir).await;

        if let Err(e) = self
            .deps
            .store
            .projects
            .update_last_scan(project.id, today)
            .await
        {
            error!(product_id = %product, "failed to update last scan: {e}");
            return EntityOutcome::Failed(format!("store update: {e}"));
        }

        let findings = self.deps.tracker.product_findings(product).await;
        match findings {
            FindingsCount::Unavailable => {
                error!(product_id = %product, "failed to get findings count");
            }
            FindingsCount::Count(0) => {}
            FindingsCount::Count(count) => {
                self.deps
                    .notifier
                    .notify(&NotificationEvent::Project {
                        team: project.team.clone(),
                        findings: count,
                        product_id: product,
                        source_url: project.source_url.clone(),
                        source_branch: project.source_branch.clone(),
                    })
                    .await;
            }
        }

        EntityOutcome::Scanned {
            uploaded,
            reports: reports.len(),
            findings,
        }
    }
}

/// Removes a scratch directory, logging instead of failing.
pub(crate) async fn discard(dir: &Path) {
    if let Err(e) = clean_dir(dir).await {
        warn!(path = %dir.display(), "failed to clean directory: {e}");
    }
}
