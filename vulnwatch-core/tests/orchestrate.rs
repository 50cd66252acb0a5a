mod support;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use support::{LoginStrippingRunner, MemoryStore, RecordingNotifier, StubCheckout, StubTracker, day};
use tempfile::TempDir;
use vulnwatch_core::notify::NotificationEvent;
use vulnwatch_core::orchestrate::{
    FixedClock, IMAGE_BRANCH_LABEL, OrchestratorDeps, OrchestratorSettings,
    ScanOrchestrator,
};
use vulnwatch_core::registry::{RegistryApi, RegistryCatalog, RegistryCredentials, TagResolver};
use vulnwatch_core::scan::{CommandRunner, ScanRunner, ScanWorkspace, ShellRunner};
use vulnwatch_core::scanners::ScannerRegistry;
use vulnwatch_core::types::{EngagementId, FindingsCount, ProductId, ScannerScope, ScannerSpec};

struct StaticRegistry {
    tags: HashMap<String, Vec<(String, i64)>>,
}

#[async_trait]
impl RegistryApi for StaticRegistry {
    async fn list_tags(&self, _registry: &str, image: &str) -> Vec<String> {
        self.tags
            .get(image)
            .map(|tags| tags.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    async fn tag_created_at(&self, _registry: &str, image: &str, tag: &str) -> Option<DateTime<Utc>> {
        let (_, secs) = self.tags.get(image)?.iter().find(|(t, _)| t == tag)?;
        Utc.timestamp_opt(*secs, 0).single()
    }
}

fn project_scanner(template: &str, scan_type: &str) -> ScannerSpec {
    ScannerSpec {
        command_template: template.into(),
        scan_type: scan_type.into(),
        scope: ScannerScope::Project,
    }
}

fn image_scanner(template: &str) -> ScannerSpec {
    ScannerSpec {
        command_template: template.into(),
        scan_type: "Trivy Scan".into(),
        scope: ScannerScope::Image,
    }
}

struct Harness {
    memory: Arc<MemoryStore>,
    tracker: Arc<StubTracker>,
    notifier: Arc<RecordingNotifier>,
    checkout: Arc<StubCheckout>,
    workdir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            memory: MemoryStore::new(),
            tracker: StubTracker::new(),
            notifier: RecordingNotifier::new(),
            checkout: StubCheckout::new(),
            workdir: tempfile::tempdir().unwrap(),
        }
    }

    fn orchestrator(
        &self,
        scanners: ScannerRegistry,
        runner: Arc<dyn CommandRunner>,
        catalog: RegistryCatalog,
        registry: StaticRegistry,
    ) -> ScanOrchestrator {
        let deps = OrchestratorDeps {
            store: self.memory.store(),
            tracker: self.tracker.clone(),
            scanners: Arc::new(scanners),
            checkout: self.checkout.clone(),
            runner: ScanRunner::new(runner),
            resolver: TagResolver::new(Arc::new(registry)),
            registries: Arc::new(catalog),
            notifier: self.notifier.clone(),
            workspace: ScanWorkspace::new(self.workdir.path()),
            clock: Arc::new(FixedClock(today())),
        };
        ScanOrchestrator::new(deps, OrchestratorSettings::default())
    }

    fn project_orchestrator(&self, scanners: Vec<ScannerSpec>) -> ScanOrchestrator {
        self.orchestrator(
            ScannerRegistry::from_specs(scanners, Vec::new()),
            Arc::new(ShellRunner),
            RegistryCatalog::default(),
            StaticRegistry {
                tags: HashMap::new(),
            },
        )
    }

    fn workdir_is_clean(&self) -> bool {
        let reports = self.workdir.path().join("reports");
        let project = self.workdir.path().join("project");
        dir_empty(&reports) && dir_empty(&project)
    }
}

fn dir_empty(path: &Path) -> bool {
    std::fs::read_dir(path).map_or(true, |mut entries| entries.next().is_none())
}

fn today() -> chrono::NaiveDate {
    day(2024, 6, 15)
}

const WRITE_REPORT: &str = r#"test -f {PROJECT_PATH}/README.md && printf '{"results": []}' > {OUTPUT_PATH}"#;

#[tokio::test]
async fn failed_clone_only_costs_its_own_project() {
    let h = Harness::new();
    for product in 1..=5 {
        h.memory
            .seed_project(&format!("group/p{product}"), product, day(2024, 6, 1));
        h.tracker.with_upload_target(product, "main", 0);
    }
    h.tracker.with_upload_target(1, "main", 3);
    h.checkout.fail_for("group/p3");

    let orchestrator = h.project_orchestrator(vec![project_scanner(WRITE_REPORT, "Semgrep Scan")]);
    let stats = orchestrator.run_projects().await;

    assert_eq!(stats.pages, 1);
    assert_eq!(stats.scanned, 4);
    assert_eq!(stats.failed, 1);
    assert!(!stats.aborted);

    let mut uploaded: Vec<_> = h
        .tracker
        .uploads()
        .iter()
        .map(|u| u.engagement_id)
        .collect();
    uploaded.sort();
    assert_eq!(
        uploaded,
        vec![EngagementId(100), EngagementId(200), EngagementId(400), EngagementId(500)]
    );
    for upload in h.tracker.uploads() {
        assert_eq!(upload.scan_type, "Semgrep Scan");
        assert_eq!(upload.branch_tag, "main");
        assert_eq!(upload.test_title, None);
        assert_eq!(upload.scan_date, today());
    }

    for product in [1, 2, 4, 5] {
        assert_eq!(h.memory.project(product).last_scan_at, today());
    }
    assert_eq!(h.memory.project(3).last_scan_at, day(2024, 6, 1));

    let events = h.notifier.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        NotificationEvent::Project { findings: 3, product_id: ProductId(1), team, .. } if team == "team-1"
    ));
    assert!(h.workdir_is_clean());
}

#[tokio::test]
async fn eligibility_gate_and_activity_flag() {
    let h = Harness::new();
    let due_today = h.memory.seed_project("group/today", 1, today());
    h.memory
        .seed_project("group/tomorrow", 2, today().succ_opt().unwrap());
    let inactive = h.memory.seed_project("group/inactive", 3, day(2024, 1, 1));
    h.memory.set_project_active(inactive.id, false);
    for product in 1..=3 {
        h.tracker.with_upload_target(product, "main", 0);
    }

    let stats = h
        .project_orchestrator(vec![project_scanner(WRITE_REPORT, "Semgrep Scan")])
        .run_projects()
        .await;

    assert_eq!(stats.scanned, 1);
    assert_eq!(stats.skipped, 2);
    assert_eq!(*h.checkout.checkouts.lock().unwrap(), vec!["group/today".to_string()]);
    assert_eq!(h.memory.project(1).last_scan_at, due_today.last_scan_at);
    assert_eq!(h.memory.project(2).last_scan_at, today().succ_opt().unwrap());
}

#[tokio::test]
async fn pages_are_processed_until_an_empty_page() {
    let h = Harness::new();
    for product in 1..=7 {
        h.memory
            .seed_project(&format!("group/p{product}"), product, day(2024, 6, 1));
    }

    let stats = h
        .project_orchestrator(vec![project_scanner("exit 1", "Semgrep Scan")])
        .run_projects()
        .await;

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.no_reports, 7);
    assert_eq!(h.checkout.checkouts.lock().unwrap().len(), 7);
    assert!(h.tracker.uploads().is_empty());
    assert!(h.workdir_is_clean());
}

#[tokio::test]
async fn missing_upload_target_still_advances_last_scan() {
    let h = Harness::new();
    h.memory.seed_project("group/p1", 1, day(2024, 6, 1));

    let stats = h
        .project_orchestrator(vec![project_scanner(WRITE_REPORT, "Semgrep Scan")])
        .run_projects()
        .await;

    assert_eq!(stats.scanned, 1);
    assert!(h.tracker.uploads().is_empty());
    assert_eq!(h.memory.project(1).last_scan_at, today());
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn store_page_errors_stop_the_pipeline() {
    let h = Harness::new();
    h.memory.seed_project("group/p1", 1, day(2024, 6, 1));
    h.memory.fail_pages.store(true, Ordering::SeqCst);

    let stats = h
        .project_orchestrator(vec![project_scanner(WRITE_REPORT, "Semgrep Scan")])
        .run_projects()
        .await;

    assert!(stats.aborted);
    assert_eq!(stats.processed(), 0);
    assert!(h.checkout.checkouts.lock().unwrap().is_empty());
}

fn image_catalog(registry: &str) -> RegistryCatalog {
    let mut catalog = RegistryCatalog::new("https");
    catalog.harbor_hosts.insert(registry.into());
    catalog.credentials.insert(
        registry.into(),
        RegistryCredentials {
            user: "robot".into(),
            password: "secret".into(),
        },
    );
    catalog
}

#[tokio::test]
async fn image_pipeline_uploads_with_synthetic_branch_and_title() {
    let h = Harness::new();
    h.memory.seed_project("group/billing", 10, day(2024, 6, 1));
    h.memory
        .seed_image(10, 77, "harbor.local/billing/api", day(2024, 6, 1));
    h.tracker.with_upload_target(10, "main", 2);

    let runner = Arc::new(LoginStrippingRunner::default());
    let registry = StaticRegistry {
        tags: HashMap::from([(
            "billing/api".to_string(),
            vec![("v1".to_string(), 100), ("v2".to_string(), 200)],
        )]),
    };
    let orchestrator = h.orchestrator(
        ScannerRegistry::from_specs(
            Vec::new(),
            vec![image_scanner("printf '{}' > {OUTPUT_PATH} && echo {IMAGE_URL}")],
        ),
        runner.clone(),
        image_catalog("harbor.local"),
        registry,
    );

    let stats = orchestrator.run_images().await;
    assert_eq!(stats.scanned, 1);

    let seen = runner.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with(
        "printf '%s' 'secret' | docker login harbor.local -u 'robot' --password-stdin && "
    ));
    assert!(!seen[0].contains("-p secret"));
    assert!(seen[0].ends_with("echo harbor.local/billing/api:v2"));

    let uploads = h.tracker.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].engagement_id, EngagementId(77));
    assert_eq!(uploads[0].branch_tag, IMAGE_BRANCH_LABEL);
    assert_eq!(uploads[0].test_title.as_deref(), Some("prod_trivy_77"));
    assert_eq!(h.memory.image(77).unwrap().last_scan_at, today());

    let events = h.notifier.events();
    assert_eq!(
        events,
        vec![NotificationEvent::Image {
            team: "team-10".into(),
            findings: 2,
            image_url: "harbor.local/billing/api".into(),
            engagement_id: EngagementId(77),
            source_url: "group/billing".into(),
            source_branch: "main".into(),
        }]
    );
    assert!(h.workdir_is_clean());
}

#[tokio::test]
async fn images_without_credentials_or_tags_are_skipped() {
    let h = Harness::new();
    h.memory
        .seed_image(10, 1, "unknown.local/billing/api", day(2024, 6, 1));
    h.memory
        .seed_image(10, 2, "harbor.local/billing/untagged", day(2024, 6, 1));
    h.tracker.with_upload_target(10, "main", 0);

    let runner = Arc::new(LoginStrippingRunner::default());
    let orchestrator = h.orchestrator(
        ScannerRegistry::from_specs(Vec::new(), vec![image_scanner("printf '{}' > {OUTPUT_PATH}")]),
        runner.clone(),
        image_catalog("harbor.local"),
        StaticRegistry {
            tags: HashMap::new(),
        },
    );

    let stats = orchestrator.run_images().await;

    assert_eq!(stats.failed, 2);
    assert!(runner.seen.lock().unwrap().is_empty());
    assert!(h.tracker.uploads().is_empty());
    assert_eq!(h.memory.image(1).unwrap().last_scan_at, day(2024, 6, 1));
    assert_eq!(h.memory.image(2).unwrap().last_scan_at, day(2024, 6, 1));
}

#[tokio::test]
async fn unavailable_findings_count_suppresses_notification() {
    let h = Harness::new();
    h.memory.seed_project("group/p1", 1, day(2024, 6, 1));
    h.tracker.with_upload_target(1, "main", 0);
    h.tracker
        .findings
        .lock()
        .unwrap()
        .insert(ProductId(1), FindingsCount::Unavailable);

    let orchestrator = h.project_orchestrator(vec![project_scanner(WRITE_REPORT, "Semgrep Scan")]);
    let stats = orchestrator.run_projects().await;

    assert_eq!(stats.scanned, 1);
    assert_eq!(h.tracker.uploads().len(), 1);
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn rejected_and_missing_reports_do_not_block_others() {
    let h = Harness::new();
    h.memory.seed_project("group/p1", 1, day(2024, 6, 1));
    h.tracker.with_upload_target(1, "main", 0);
    h.tracker
        .rejected_reports
        .lock()
        .unwrap()
        .insert("rejected".into());

    let orchestrator = h.project_orchestrator(vec![
        project_scanner("printf 'rejected' > {OUTPUT_PATH}", "Gitleaks Scan"),
        project_scanner("exit 2", "KICS Scan"),
        project_scanner(WRITE_REPORT, "Semgrep Scan"),
    ]);
    let stats = orchestrator.run_projects().await;
    assert_eq!(stats.scanned, 1);

    let uploads = h.tracker.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].scan_type, "Semgrep Scan");
    assert!(uploads[0].path.ends_with("2.json"));
    assert_eq!(h.memory.project(1).last_scan_at, today());
}

#[tokio::test]
async fn output_of_a_failed_scanner_is_never_uploaded() {
    let h = Harness::new();
    h.memory.seed_project("group/p1", 1, day(2024, 6, 1));
    h.tracker.with_upload_target(1, "main", 0);

    let orchestrator = h.project_orchestrator(vec![
        project_scanner("printf '{}' > {OUTPUT_PATH}; exit 1", "Gitleaks Scan"),
        project_scanner(WRITE_REPORT, "Semgrep Scan"),
    ]);
    let stats = orchestrator.run_projects().await;

    assert_eq!(stats.scanned, 1);
    let uploads = h.tracker.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].scan_type, "Semgrep Scan");
    assert!(uploads[0].path.ends_with("1.json"));
}

#[tokio::test]
async fn a_project_whose_only_scanner_failed_has_nothing_to_upload() {
    let h = Harness::new();
    h.memory.seed_project("group/p1", 1, day(2024, 6, 1));
    h.tracker.with_upload_target(1, "main", 0);

    let orchestrator =
        h.project_orchestrator(vec![project_scanner("printf '{}' > {OUTPUT_PATH}; exit 1", "Gitleaks Scan")]);
    let stats = orchestrator.run_projects().await;

    assert_eq!(stats.no_reports, 1);
    assert!(h.tracker.uploads().is_empty());
    assert!(h.workdir_is_clean());
}

#[test]
fn orchestrator_debug_lists_its_collaborators() {
    let h = Harness::new();
    let orchestrator = h.project_orchestrator(vec![project_scanner(WRITE_REPORT, "Semgrep Scan")]);

    let rendered = format!("{orchestrator:?}");

    assert!(rendered.contains("OrchestratorDeps"));
    assert!(rendered.contains("Semgrep Scan"));
    assert!(rendered.contains("page_size: 5"));
}
