use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::ProductId;

/// Persisted view of one monitored source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub is_active: bool,
    /// Source-control path of the repository (e.g. `group/service`).
    pub source_url: String,
    pub source_branch: String,
    pub tracker_product_id: ProductId,
    pub last_scan_at: NaiveDate,
    pub team: String,
}

/// Row payload for inserting a project discovered during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub source_url: String,
    pub source_branch: String,
    pub tracker_product_id: ProductId,
    pub last_scan_at: NaiveDate,
    pub team: String,
}

/// One entry of the project list handed to the service at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDescriptor {
    pub gitlab_url: String,
    pub gitlab_branch: String,
    pub public_url: String,
    pub dast_params: String,
    pub team: String,
}
