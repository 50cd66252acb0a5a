use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::executor::{CommandOutcome, CommandRunner};
use super::template::{self, IMAGE_URL, OUTPUT_PATH, PROJECT_PATH};
use super::workspace::ScanWorkspace;
use crate::registry::RegistryCredentials;
use crate::types::{ProductId, ScannerSpec};

/// Runs the scanners of one entity one after another.
#[derive(Clone)]
pub struct ScanRunner {
    commands: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for ScanRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanRunner").finish_non_exhaustive()
    }
}

impl ScanRunner {
    pub fn new(commands: Arc<dyn CommandRunner>) -> Self {
        Self { commands }
    }

    /// Returns how many scanners exited successfully.
    pub async fn scan_project(
        &self,
        product: ProductId,
        scanners: &[ScannerSpec],
        project_dir: &Path,
        reports_dir: &Path,
    ) -> usize {
        let project_path = project_dir.display().to_string();
        let mut succeeded = 0;
        for (index, scanner) in scanners.iter().enumerate() {
            let output = ScanWorkspace::report_path(reports_dir, index);
            let output = output.display().to_string();
            let command = template::render(
                &scanner.command_template,
                &[(PROJECT_PATH, project_path.as_str()), (OUTPUT_PATH, output.as_str())],
            );
            let outcome = self.commands.run(&command).await;
            succeeded += self.settle(product, scanner, &outcome, &output).await;
        }
        succeeded
    }

    /// `image_ref` already carries the resolved tag. The registry login and the
    /// scanner share one shell invocation.
    pub async fn scan_image(
        &self,
        product: ProductId,
        scanners: &[ScannerSpec],
        registry: &str,
        credentials: &RegistryCredentials,
        image_ref: &str,
        reports_dir: &Path,
    ) -> usize {
        let login = docker_login_command(registry, credentials);
        let mut succeeded = 0;
        for (index, scanner) in scanners.iter().enumerate() {
            let output = ScanWorkspace::report_path(reports_dir, index);
            let output = output.display().to_string();
            let scan = template::render(
                &scanner.command_template,
                &[(IMAGE_URL, image_ref), (OUTPUT_PATH, output.as_str())],
            );
            let outcome = self.commands.run(&format!("{login} && {scan}")).await;
            succeeded += self.settle(product, scanner, &outcome, &output).await;
        }
        succeeded
    }

    /// A failed scanner has no report, even if it left a partial file behind.
    async fn settle(
        &self,
        product: ProductId,
        scanner: &ScannerSpec,
        outcome: &CommandOutcome,
        output: &str,
    ) -> usize {
        if log_outcome(product, &scanner.scan_type, outcome) {
            return 1;
        }
        match tokio::fs::remove_file(output).await {
            Ok(()) => debug!(product_id = %product, report = output, "discarded failed scanner output"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(product_id = %product, report = output, "failed to discard scanner output: {e}"),
        }
        0
    }
}

/// The password goes through stdin so it never shows up in the process list.
pub fn docker_login_command(registry: &str, credentials: &RegistryCredentials) -> String {
    format!(
        "printf '%s' {} | docker login {registry} -u {} --password-stdin",
        shell_quote(&credentials.password),
        shell_quote(&credentials.user),
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn log_outcome(product: ProductId, scan_type: &str, outcome: &CommandOutcome) -> bool {
    match outcome {
        CommandOutcome::Succeeded => {
            info!(product_id = %product, scan_type, "scanner succeeded");
            true
        }
        CommandOutcome::Failed { code, stderr } => {
            warn!(product_id = %product, scan_type, ?code, stderr = %stderr, "scanner failed");
            false
        }
        CommandOutcome::SpawnFailed(reason) => {
            warn!(product_id = %product, scan_type, reason = %reason, "scanner could not start");
            false
        }
    }
}
