use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::ProductId;

/// Dynamic-scan parameters stored per project. Part of the store contract;
/// the scan pipelines do not read it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DastParams {
    pub id: i64,
    pub project_id: ProductId,
    pub params: String,
    pub last_scan_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDastParams {
    pub project_id: ProductId,
    pub params: String,
    pub last_scan_at: NaiveDate,
}
