use crate::types::{ScannerScope, ScannerSpec};

const PROJECT_PREFIX: &str = "PROJECT: ";
const IMAGE_PREFIX: &str = "IMAGE: ";
const SCAN_TYPE_PREFIX: &str = "DD_SCAN_TYPE: ";
const COMMENT_PREFIX: &str = "#";

/// Outcome of parsing one scanner definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerEntry {
    Project(ScannerSpec),
    Image(ScannerSpec),
    /// Command line commented out with `#`.
    Disabled,
    /// Well-formed but carries neither scope marker.
    Unscoped,
    Malformed(String),
}

/// Parses the two-line format:
///
/// ```text
/// PROJECT: semgrep --json -o {OUTPUT_PATH} {PROJECT_PATH}
/// DD_SCAN_TYPE: Semgrep JSON Report
/// ```
///
/// Shape is checked before the comment marker, so a commented file with a
/// broken second line is still reported as malformed.
pub fn parse_scanner_file(content: &str) -> ScannerEntry {
    let lines: Vec<&str> = content.lines().collect();
    let [command, scan_type] = lines.as_slice() else {
        return ScannerEntry::Malformed(format!("expected 2 lines, found {}", lines.len()));
    };
    let Some(scan_type) = scan_type.strip_prefix(SCAN_TYPE_PREFIX) else {
        return ScannerEntry::Malformed(format!("second line must start with `{SCAN_TYPE_PREFIX}`"));
    };

    if command.starts_with(COMMENT_PREFIX) {
        return ScannerEntry::Disabled;
    }

    let spec = |command_template: &str, scope| ScannerSpec {
        command_template: command_template.to_string(),
        scan_type: scan_type.to_string(),
        scope,
    };

    if let Some(template) = command.strip_prefix(PROJECT_PREFIX) {
        ScannerEntry::Project(spec(template, ScannerScope::Project))
    } else if let Some(template) = command.strip_prefix(IMAGE_PREFIX) {
        ScannerEntry::Image(spec(template, ScannerScope::Image))
    } else {
        ScannerEntry::Unscoped
    }
}
