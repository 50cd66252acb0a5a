use serde::{Deserialize, Serialize};

use crate::types::{EngagementId, ProductId};

/// Base URLs used for deep links in chat messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Tracker UI root, e.g. `https://defectdojo.example`.
    pub tracker_base: String,
    /// Source-control UI root, e.g. `https://git.example`.
    pub source_base: String,
}

impl LinkConfig {
    fn tracker(&self, tail: &str) -> String {
        format!("{}/{tail}", self.tracker_base.trim_end_matches('/'))
    }

    fn source(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.source_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Something worth telling a team about after a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Project {
        team: String,
        findings: u64,
        product_id: ProductId,
        source_url: String,
        source_branch: String,
    },
    Image {
        team: String,
        findings: u64,
        image_url: String,
        engagement_id: EngagementId,
        source_url: String,
        source_branch: String,
    },
}

impl NotificationEvent {
    pub fn render(&self, links: &LinkConfig) -> String {
        match self {
            NotificationEvent::Project {
                team,
                findings,
                product_id,
                source_url,
                source_branch,
            } => format!(
                ":small_blue_diamond: {team}\n\n\
                 :warning: Continuous monitoring found {findings} vulnerabilities\n\
                 – DefectDojo: {}\n\
                 – Gitlab: {}\n\
                 – Branch: {source_branch}\n",
                links.tracker(&format!("product/{product_id}")),
                links.source(source_url),
            ),
            NotificationEvent::Image {
                team,
                findings,
                image_url,
                engagement_id,
                source_url,
                source_branch,
            } => format!(
                ":small_blue_diamond: {team}\n\n\
                 :warning: Continuous monitoring found {findings} vulnerabilities\n\
                 – Image: {image_url}\n\
                 – DefectDojo: {}\n\
                 – Gitlab: {}\n\
                 – Branch: {source_branch}\n",
                links.tracker(&format!("engagement/{engagement_id}")),
                links.source(source_url),
            ),
        }
    }
}
