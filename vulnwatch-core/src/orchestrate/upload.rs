use chrono::NaiveDate;
use futures::future::join_all;
use tracing::{error, info};

use crate::scan::ReportFile;
use crate::tracker::{FindingsTracker, ReportUpload};
use crate::types::{EndpointId, EngagementId, ProductId, ScannerSpec};

/// Fields shared by every report of one entity.
#[derive(Debug, Clone)]
pub struct UploadTarget<'a> {
    pub product: ProductId,
    pub endpoint_id: EndpointId,
    pub engagement_id: EngagementId,
    pub branch_tag: &'a str,
    pub test_title: Option<String>,
    pub scan_date: NaiveDate,
}

/// Submits every report concurrently and returns how many were accepted.
pub async fn upload_reports(
    tracker: &dyn FindingsTracker,
    scanners: &[ScannerSpec],
    reports: &[ReportFile],
    target: &UploadTarget<'_>,
) -> usize {
    let uploads = reports.iter().filter_map(|report| {
        let scanner = scanners.get(report.index)?;
        Some(ReportUpload {
            scan_type: scanner.scan_type.clone(),
            endpoint_id: target.endpoint_id,
            engagement_id: target.engagement_id,
            branch_tag: target.branch_tag.to_string(),
            test_title: target.test_title.clone(),
            scan_date: target.scan_date,
            path: report.path.clone(),
        })
    });

    let results = join_all(uploads.map(|upload| async move {
        let test_id = tracker.submit_report(&upload).await;
        (upload, test_id)
    }))
    .await;

    let mut accepted = 0;
    for (upload, test_id) in results {
        match test_id {
            Some(test_id) => {
                accepted += 1;
                info!(
                    product_id = %target.product,
                    report = %upload.path.display(),
                    scan_type = %upload.scan_type,
                    %test_id,
                    "uploaded report"
                );
            }
            None => error!(
                product_id = %target.product,
                report = %upload.path.display(),
                scan_type = %upload.scan_type,
                "failed to upload report"
            ),
        }
    }
    accepted
}
