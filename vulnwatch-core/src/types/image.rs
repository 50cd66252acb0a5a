use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::{EngagementId, ProductId};

/// Persisted container image produced by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub is_active: bool,
    /// Tracker product of the owning project.
    pub project_id: ProductId,
    pub image_url: String,
    pub tracker_engagement_id: EngagementId,
    pub last_scan_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub project_id: ProductId,
    pub image_url: String,
    pub tracker_engagement_id: EngagementId,
    pub last_scan_at: NaiveDate,
}

/// Splits `registry/repository/name` into `(registry, repository/name)`.
pub fn split_image_reference(reference: &str) -> (&str, &str) {
    match reference.split_once('/') {
        Some((registry, rest)) => (registry, rest),
        None => (reference, ""),
    }
}
