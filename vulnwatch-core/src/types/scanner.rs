use serde::{Deserialize, Serialize};

/// Whether a scanner targets a source checkout or a container image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerScope {
    Project,
    Image,
}

/// One loaded scanner definition. Position inside its scope list is the
/// report file index (`{index}.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerSpec {
    pub command_template: String,
    pub scan_type: String,
    pub scope: ScannerScope,
}
