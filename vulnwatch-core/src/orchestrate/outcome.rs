use crate::types::FindingsCount;

/// Why an entity was left alone this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Inactive,
    NotDue,
}

/// Terminal state of one entity's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityOutcome {
    Skipped(SkipReason),
    /// Scanners ran (or none are configured) but nothing was written.
    NoReports,
    Scanned {
        uploaded: usize,
        reports: usize,
        findings: FindingsCount,
    },
    Failed(String),
}

/// Tally of one pipeline pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub pages: usize,
    pub skipped: usize,
    pub no_reports: usize,
    pub scanned: usize,
    pub failed: usize,
    /// Set when paging stopped on a store error.
    pub aborted: bool,
}

impl PipelineStats {
    pub fn record(&mut self, outcome: &EntityOutcome) {
        match outcome {
            EntityOutcome::Skipped(_) => self.skipped += 1,
            EntityOutcome::NoReports => self.no_reports += 1,
            EntityOutcome::Scanned { .. } => self.scanned += 1,
            EntityOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.skipped + self.no_reports + self.scanned + self.failed
    }
}
