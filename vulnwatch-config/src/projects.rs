use std::fs;
use std::path::Path;

use tracing::info;
use vulnwatch_core::types::ProjectDescriptor;

use crate::loader::error::ConfigLoadError;

/// Reads the JSON array of project descriptors. Missing fields default to
/// empty strings.
pub fn load_project_descriptors(path: &Path) -> Result<Vec<ProjectDescriptor>, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::ProjectsIo {
        path: path.to_path_buf(),
        source,
    })?;
    let projects: Vec<ProjectDescriptor> =
        serde_json::from_str(&contents).map_err(|source| ConfigLoadError::ProjectsParse {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), projects = projects.len(), "loaded project list");
    Ok(projects)
}
