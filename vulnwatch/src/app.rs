use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use vulnwatch_config::{Config, load_project_descriptors};
use vulnwatch_core::database::PostgresDatabase;
use vulnwatch_core::notify::{Notifier, RocketChatNotifier};
use vulnwatch_core::orchestrate::{
    OrchestratorDeps, OrchestratorSettings, ScanOrchestrator, SystemClock,
};
use vulnwatch_core::reconcile::ReconciliationEngine;
use vulnwatch_core::registry::{HttpRegistryClient, TagResolver};
use vulnwatch_core::scan::{GitCheckout, ScanRunner, ScanWorkspace, ShellRunner};
use vulnwatch_core::scanners::{GitlabConfigRepository, ScannerRegistry};
use vulnwatch_core::tracker::{DefectDojoClient, FindingsTracker};

/// One monitoring pass: reconcile, load scanners, scan projects, scan images.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let descriptors = load_project_descriptors(&config.pipeline.projects_path)
        .context("failed to load project list")?;
    if descriptors.is_empty() {
        info!("no projects to be scanned, exit");
        return Ok(());
    }

    let tracker: Arc<dyn FindingsTracker> = Arc::new(
        DefectDojoClient::new(&config.tracker.host, &config.tracker.token, config.naming.clone())
            .context("failed to build tracker client")?,
    );
    let mut chat = RocketChatNotifier::new(
        &config.chat.host,
        &config.chat.user_id,
        &config.chat.auth_token,
        &config.chat.room_id,
        config.links.clone(),
    )
    .context("failed to build chat client")?;
    if let Some(thread) = &config.chat.thread_id {
        chat = chat.with_thread(thread.as_str());
    }
    let notifier: Arc<dyn Notifier> = Arc::new(chat);
    let scanner_source = GitlabConfigRepository::new(
        &config.source_control.host,
        &config.source_control.token,
        config.source_control.scanners_project,
    )
    .context("failed to build scanner config client")?;
    let checkout = GitCheckout::new(&config.source_control.host, &config.source_control.token)
        .context("failed to build git checkout")?;
    let registries = Arc::new(config.registries.catalog());
    let registry_client =
        HttpRegistryClient::new(registries.clone()).context("failed to build registry client")?;

    let db = PostgresDatabase::connect(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to PostgreSQL")?;
    let store = db.store();

    let summary = ReconciliationEngine::new(store.clone(), tracker.clone())
        .sync_projects(&descriptors)
        .await;
    info!(
        bootstrapped = summary.bootstrapped,
        reconciled = summary.reconciled,
        skipped = summary.skipped,
        "projects synchronized with tracker"
    );

    let scanners = ScannerRegistry::load(&scanner_source).await;

    let orchestrator = ScanOrchestrator::new(
        OrchestratorDeps {
            store,
            tracker,
            scanners: Arc::new(scanners),
            checkout: Arc::new(checkout),
            runner: ScanRunner::new(Arc::new(ShellRunner)),
            resolver: TagResolver::new(Arc::new(registry_client)),
            registries,
            notifier,
            workspace: ScanWorkspace::new(config.pipeline.work_dir.clone()),
            clock: Arc::new(SystemClock),
        },
        OrchestratorSettings {
            page_size: config.pipeline.page_size,
            naming: config.naming.clone(),
        },
    );

    let projects = orchestrator.run_projects().await;
    let images = orchestrator.run_images().await;
    info!(
        projects_scanned = projects.scanned,
        projects_failed = projects.failed,
        images_scanned = images.scanned,
        images_failed = images.failed,
        "monitoring pass finished"
    );

    db.close().await;
    Ok(())
}
