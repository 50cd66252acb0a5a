//! Scan execution: working directories, source checkouts, and the shell
//! invocations that produce report files.

pub mod checkout;
pub mod executor;
pub mod runner;
pub mod template;
pub mod workspace;

pub use checkout::{GitCheckout, SourceCheckout};
pub use executor::{CommandOutcome, CommandRunner, ShellRunner};
pub use runner::ScanRunner;
pub use workspace::{ReportFile, ScanWorkspace, clean_dir};
