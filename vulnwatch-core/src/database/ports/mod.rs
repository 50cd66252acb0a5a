//! Repository ports for the three persisted tables.
//!
//! The reconciliation engine and the scan orchestrator only talk to these
//! traits; the PostgreSQL adapters live under `database::postgres`.

pub mod dast;
pub mod images;
pub mod projects;
