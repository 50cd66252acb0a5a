//! # vulnwatch-core
//!
//! Keeps a local view of monitored projects and their container images in
//! sync with a findings tracker, runs the configured security scanners against
//! whatever is due, uploads the resulting reports, and raises chat
//! notifications when findings exist.
//!
//! The crate is split along the collaborators of one run:
//!
//! - [`database`]: typed schema, repository ports and PostgreSQL adapters
//! - [`tracker`]: findings-tracker gateway (products, engagements, uploads)
//! - [`registry`]: container registry tag resolution
//! - [`scanners`]: scanner definitions loaded from a config repository
//! - [`scan`]: working directories, checkouts and command execution
//! - [`reconcile`]: store/tracker reconciliation
//! - [`orchestrate`]: paginated scan pipelines
//! - [`notify`]: chat notifications

pub mod database;
pub mod error;
pub mod notify;
pub mod orchestrate;
pub mod reconcile;
pub mod registry;
pub mod scan;
pub mod scanners;
pub mod tracker;
pub mod types;

pub use error::{MonitorError, Result};

/// Embedded migrations creating the `projects`, `images` and `dast` tables.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
