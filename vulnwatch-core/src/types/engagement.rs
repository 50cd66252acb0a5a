use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::ids::EngagementId;

/// Tracker-side engagement as returned by the engagements listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: EngagementId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub branch_tag: Option<String>,
    #[serde(default, rename = "updated")]
    pub updated_at: Option<String>,
}

impl Engagement {
    /// Calendar day of the last tracker-side update, if it parses.
    pub fn updated_on(&self) -> Option<NaiveDate> {
        self.updated_at.as_deref().and_then(parse_tracker_date)
    }
}

/// Image-scoped engagement projected to what reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEngagement {
    pub engagement_id: EngagementId,
    pub image_name: String,
    pub updated_on: NaiveDate,
}

/// Most recent tracker activity for a product within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastUpdate {
    At(NaiveDate),
    /// No engagement matched the scope filter.
    Never,
}

/// Prefix vocabulary used by the engagement naming convention
/// `<target>_<scanner-family>_<image...>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    pub target_prefixes: BTreeSet<String>,
    pub scanner_prefixes: BTreeSet<String>,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            target_prefixes: BTreeSet::from(["prod".to_string()]),
            scanner_prefixes: BTreeSet::from(["trivy".to_string()]),
        }
    }
}

/// Scope classification of an engagement name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngagementKind {
    /// Fewer than two underscore-delimited segments.
    Unscoped,
    Project { on_target: bool },
    Image { on_target: bool, image: String },
}

/// Scope filter used when deriving last-update timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementScope {
    Project,
    Image,
}

impl NamingRules {
    pub fn classify(&self, name: &str) -> EngagementKind {
        let segments: Vec<&str> = name.split('_').collect();
        if segments.len() < 2 {
            return EngagementKind::Unscoped;
        }

        let on_target = self.target_prefixes.contains(segments[0]);
        if self.scanner_prefixes.contains(segments[1]) {
            EngagementKind::Image {
                on_target,
                image: segments[2..].join("_"),
            }
        } else {
            EngagementKind::Project { on_target }
        }
    }

    /// Whether an engagement counts towards the last-update timestamp of `scope`.
    pub fn matches_scope(&self, name: &str, scope: EngagementScope) -> bool {
        matches!(
            (self.classify(name), scope),
            (EngagementKind::Project { on_target: true }, EngagementScope::Project)
                | (EngagementKind::Image { on_target: true, .. }, EngagementScope::Image)
        )
    }

    /// Title used for reports uploaded into an image engagement.
    pub fn image_report_title(&self, engagement_id: EngagementId) -> String {
        let target = self
            .target_prefixes
            .iter()
            .next()
            .map(String::as_str)
            .unwrap_or("prod");
        let scanner = self
            .scanner_prefixes
            .iter()
            .next()
            .map(String::as_str)
            .unwrap_or("trivy");
        format!("{target}_{scanner}_{engagement_id}")
    }
}

/// Parses tracker timestamps such as `2024-03-01T10:15:30.123456Z` down to the day.
pub fn parse_tracker_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..19)?;
    NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}
