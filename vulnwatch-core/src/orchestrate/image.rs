use tracing::{error, info};

use super::project::discard;
use super::upload::{UploadTarget, upload_reports};
use super::{EntityOutcome, IMAGE_BRANCH_LABEL, ScanOrchestrator, SkipReason, is_due};
use crate::notify::NotificationEvent;
use crate::types::{FindingsCount, Image, split_image_reference};

impl ScanOrchestrator {
    pub(crate) async fn process_image(&self, image: Image) -> EntityOutcome {
        let product = image.project_id;
        let engagement_id = image.tracker_engagement_id;
        info!(product_id = %product, image = %image.image_url, "processing image");

        if !image.is_active {
            info!(product_id = %product, image = %image.image_url, "skipping inactive image");
            return EntityOutcome::Skipped(SkipReason::Inactive);
        }
        let today = self.deps.clock.today();
        if !is_due(image.last_scan_at, today) {
            info!(product_id = %product, image = %image.image_url, last_scan_at = %image.last_scan_at, "skipping image scheduled in the future");
            return EntityOutcome::Skipped(SkipReason::NotDue);
        }

        let scanners = self.deps.scanners.image_scanners();
        if scanners.is_empty() {
            info!(product_id = %product, "no image scanners configured");
            return EntityOutcome::NoReports;
        }

        let (registry, repository) = split_image_reference(&image.image_url);
        let Some(credentials) = self.deps.registries.credentials(registry) else {
            error!(product_id = %product, registry, "no credentials for registry");
            return EntityOutcome::Failed(format!("no credentials for {registry}"));
        };
        let Some(tag) = self
            .deps
            .resolver
            .resolve_latest_tag(registry, repository)
            .await
        else {
            error!(product_id = %product, image = %image.image_url, "failed to resolve a tag");
            return EntityOutcome::Failed("no resolvable tag".into());
        };
        info!(product_id = %product, image = %image.image_url, tag = %tag, "fetched latest tag");

        let workspace = &self.deps.workspace;
        let reports_dir = workspace.image_reports_dir(product, engagement_id);
        if let Err(e) = workspace.prepare(&reports_dir).await {
            error!(product_id = %product, "failed to prepare reports directory: {e}");
            return EntityOutcome::Failed(format!("reports directory: {e}"));
        }

        let image_ref = format!("{}:{tag}", image.image_url);
        self.deps
            .runner
            .scan_image(product, scanners, registry, credentials, &image_ref, &reports_dir)
            .await;

        let reports = match workspace.list_reports(&reports_dir, scanners.len()).await {
            Ok(reports) => reports,
            Err(e) => {
                error!(product_id = %product, "failed to list reports: {e}");
                discard(&reports_dir).await;
                return EntityOutcome::Failed(format!("report listing: {e}"));
            }
        };
        if reports.is_empty() {
            info!(product_id = %product, image = %image.image_url, "no reports to upload");
            discard(&reports_dir).await;
            return EntityOutcome::NoReports;
        }

        let uploaded = match self.deps.tracker.endpoint_id(product).await {
            Some(endpoint_id) => {
                let target = UploadTarget {
                    product,
                    endpoint_id,
                    engagement_id,
                    branch_tag: IMAGE_BRANCH_LABEL,
                    test_title: Some(self.settings.naming.image_report_title(engagement_id)),
                    scan_date: today,
                };
                upload_reports(self.deps.tracker.as_ref(), scanners, &reports, &target).await
            }
            None => {
                error!(product_id = %product, "failed to send image reports: no endpoint");
                0
            }
        };
        discard(&reports_dir).await;

        if let Err(e) = self
            .deps
            .store
            .images
            .update_last_scan(engagement_id, today)
            .await
        {
            error!(product_id = %product, %engagement_id, "failed to update last scan: {e}");
            return EntityOutcome::Failed(format!("store update: {e}"));
        }

        let findings = self.deps.tracker.product_findings(product).await;
        match findings {
            FindingsCount::Unavailable => {
                error!(product_id = %product, "failed to get findings count");
            }
            FindingsCount::Count(0) => {}
            FindingsCount::Count(count) => self.notify_image(&image, count).await,
        }

        EntityOutcome::Scanned {
            uploaded,
            reports: reports.len(),
            findings,
        }
    }

    async fn notify_image(&self, image: &Image, findings: u64) {
        let project = match self.deps.store.projects.find_by_product_id(image.project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                error!(product_id = %image.project_id, "failed to get owning project");
                return;
            }
            Err(e) => {
                error!(product_id = %image.project_id, "failed to load owning project: {e}");
                return;
            }
        };

        self.deps
            .notifier
            .notify(&NotificationEvent::Image {
                team: project.team,
                findings,
                image_url: image.image_url.clone(),
                engagement_id: image.tracker_engagement_id,
                source_url: project.source_url,
                source_branch: project.source_branch,
            })
            .await;
    }
}
