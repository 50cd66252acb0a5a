use std::path::PathBuf;

use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};

use crate::types::{EndpointId, EngagementId};

/// Name the report file part is uploaded under.
pub const REPORT_FILE_NAME: &str = "scan.json";
const PIPELINE_MARKER: &str = "continuous-monitoring";

/// One scanner report to import into an engagement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportUpload {
    pub scan_type: String,
    pub endpoint_id: EndpointId,
    pub engagement_id: EngagementId,
    pub branch_tag: String,
    pub test_title: Option<String>,
    pub scan_date: NaiveDate,
    pub path: PathBuf,
}

impl ReportUpload {
    /// Text fields of the import form, in submission order.
    pub fn metadata(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("minimum_severity", "Medium".to_string()),
            ("active", "true".to_string()),
            ("verified", "true".to_string()),
            ("close_old_findings", "true".to_string()),
            ("close_old_findings_product_scope", "false".to_string()),
            ("push_to_jira", "false".to_string()),
            ("build_id", PIPELINE_MARKER.to_string()),
            ("commit_hash", PIPELINE_MARKER.to_string()),
            ("scan_date", self.scan_date.format("%Y-%m-%d").to_string()),
            ("scan_type", self.scan_type.clone()),
            ("endpoint_to_add", self.endpoint_id.to_string()),
            ("engagement", self.engagement_id.to_string()),
            ("branch_tag", self.branch_tag.clone()),
        ];
        if let Some(title) = &self.test_title {
            fields.push(("test_title", title.clone()));
        }
        fields
    }

    pub fn into_form(&self, contents: Vec<u8>) -> reqwest::Result<Form> {
        let form = self
            .metadata()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));
        let file = Part::bytes(contents)
            .file_name(REPORT_FILE_NAME)
            .mime_str("application/json")?;
        Ok(form.part("file", file))
    }
}
