//! Store/tracker reconciliation.

pub mod diff;
pub mod engine;

pub use diff::{ReconcileCase, ReconcilePlan};
pub use engine::{ProjectSync, ReconciliationEngine, SyncSummary};
