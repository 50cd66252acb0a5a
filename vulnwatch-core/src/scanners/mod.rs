//! Scanner definitions: parsing, remote loading, ordered lookup.

pub mod parse;
pub mod source;

use tracing::{error, info, warn};

use crate::types::ScannerSpec;

pub use parse::{ScannerEntry, parse_scanner_file};
pub use source::{GitlabConfigRepository, ScannerConfigSource};

/// Scanners loaded for one run, split by scope.
///
/// List position is load-bearing: a scanner at index `i` writes `{i}.json`
/// and uploads map that index back to the scan type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannerRegistry {
    project: Vec<ScannerSpec>,
    image: Vec<ScannerSpec>,
}

impl ScannerRegistry {
    pub fn from_specs(project: Vec<ScannerSpec>, image: Vec<ScannerSpec>) -> Self {
        Self { project, image }
    }

    /// Reads every definition file from `source`. A failed listing yields an
    /// empty registry; unreadable or malformed files are skipped.
    pub async fn load(source: &dyn ScannerConfigSource) -> Self {
        let mut registry = Self::default();

        let files = match source.list_files().await {
            Ok(files) => files,
            Err(e) => {
                error!("failed to list scanner configs: {e}");
                return registry;
            }
        };

        for path in files {
            let content = match source.read_file(&path).await {
                Ok(content) => content,
                Err(e) => {
                    error!(path = %path, "failed to read scanner config: {e}");
                    continue;
                }
            };
            registry.push(&path, parse_scanner_file(&content));
        }

        info!(
            project_scanners = registry.project.len(),
            image_scanners = registry.image.len(),
            "scanner registry loaded"
        );
        registry
    }

    fn push(&mut self, path: &str, entry: ScannerEntry) {
        match entry {
            ScannerEntry::Project(spec) => self.project.push(spec),
            ScannerEntry::Image(spec) => self.image.push(spec),
            ScannerEntry::Disabled => info!(path, "ignoring commented scanner"),
            ScannerEntry::Unscoped => warn!(path, "scanner config without scope marker"),
            ScannerEntry::Malformed(reason) => {
                error!(path, reason = %reason, "wrong scanner config format")
            }
        }
    }

    pub fn project_scanners(&self) -> &[ScannerSpec] {
        &self.project
    }

    pub fn image_scanners(&self) -> &[ScannerSpec] {
        &self.image
    }

    pub fn is_empty(&self) -> bool {
        self.project.is_empty() && self.image.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;

    use super::*;
    use crate::types::ScannerScope;
    use crate::{MonitorError, Result};

    struct MapSource {
        files: Vec<String>,
        contents: BTreeMap<String, String>,
    }

    impl MapSource {
        fn new(entries: &[(&str, Option<&str>)]) -> Self {
            Self {
                files: entries.iter().map(|(p, _)| p.to_string()).collect(),
                contents: entries
                    .iter()
                    .filter_map(|(p, c)| c.map(|c| (p.to_string(), c.to_string())))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl ScannerConfigSource for MapSource {
        async fn list_files(&self) -> Result<Vec<String>> {
            Ok(self.files.clone())
        }

        async fn read_file(&self, path: &str) -> Result<String> {
            self.contents
                .get(path)
                .cloned()
                .ok_or_else(|| MonitorError::NotFound(path.to_string()))
        }
    }

    struct DownSource;

    #[async_trait]
    impl ScannerConfigSource for DownSource {
        async fn list_files(&self) -> Result<Vec<String>> {
            Err(MonitorError::Internal("unreachable".into()))
        }

        async fn read_file(&self, _path: &str) -> Result<String> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn load_keeps_listing_order_per_scope() {
        let source = MapSource::new(&[
            ("semgrep", Some("PROJECT: semgrep --json > {OUTPUT_PATH}\nDD_SCAN_TYPE: Semgrep Scan")),
            ("trivy", Some("IMAGE: trivy image {IMAGE_URL} -o {OUTPUT_PATH}\nDD_SCAN_TYPE: Trivy Scan")),
            ("gitleaks", Some("#PROJECT: gitleaks\nDD_SCAN_TYPE: Gitleaks Scan")),
            ("broken", Some("PROJECT: only-one-line")),
            ("missing", None),
            ("kics", Some("PROJECT: kics scan -p {PROJECT_PATH} -o {OUTPUT_PATH}\nDD_SCAN_TYPE: KICS Scan")),
        ]);

        let registry = ScannerRegistry::load(&source).await;

        let project: Vec<_> = registry
            .project_scanners()
            .iter()
            .map(|s| s.scan_type.as_str())
            .collect();
        assert_eq!(project, vec!["Semgrep Scan", "KICS Scan"]);
        assert_eq!(registry.image_scanners().len(), 1);
        assert_eq!(registry.image_scanners()[0].scope, ScannerScope::Image);
    }

    #[tokio::test]
    async fn failed_listing_yields_empty_registry() {
        let registry = ScannerRegistry::load(&DownSource).await;
        assert!(registry.is_empty());
    }
}
