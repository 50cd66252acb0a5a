use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::Result;
use crate::types::{EngagementId, ProductId};

/// A report written by the scanner at `index` of its scope list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub index: usize,
    pub path: PathBuf,
}

/// Temporary directory layout for checkouts and reports. Every path is
/// namespaced by product id (and engagement id for images) so concurrent
/// entities never share a directory.
#[derive(Debug, Clone)]
pub struct ScanWorkspace {
    root: PathBuf,
}

impl ScanWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn project_dir(&self, product: ProductId) -> PathBuf {
        self.root.join("project").join(product.to_string())
    }

    pub fn project_reports_dir(&self, product: ProductId) -> PathBuf {
        self.root.join("reports").join(product.to_string())
    }

    pub fn image_reports_dir(&self, product: ProductId, engagement: EngagementId) -> PathBuf {
        self.root
            .join("reports")
            .join(format!("{product}_{engagement}"))
    }

    /// Output path for the scanner at `index`.
    pub fn report_path(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("{index}.json"))
    }

    /// Empties `dir` and recreates it.
    pub async fn prepare(&self, dir: &Path) -> Result<()> {
        clean_dir(dir).await?;
        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }

    /// Report files in `dir` whose index falls inside `scanner_count`, sorted
    /// by index. Anything else is logged and ignored.
    pub async fn list_reports(&self, dir: &Path, scanner_count: usize) -> Result<Vec<ReportFile>> {
        let mut reports = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(reports),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            match report_index(&path) {
                Some(index) if index < scanner_count => reports.push(ReportFile { index, path }),
                _ => warn!(report = %path.display(), "ignoring unexpected report file"),
            }
        }

        reports.sort_by_key(|report| report.index);
        Ok(reports)
    }
}

fn report_index(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".json")?.parse().ok()
}

/// Removes a directory tree if it exists.
pub async fn clean_dir(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "cleaned directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
