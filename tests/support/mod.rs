// ABOUTME: Test support utilities.
// ABOUTME: In-memory cluster and script fakes plus a harness wiring them to the lifecycle services.

// Each test binary only uses some of these helpers, so allow dead_code.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shipyard::catalog::Catalog;
use shipyard::cluster::{BuildSummary, ClusterError, ClusterOps, DeploymentSummary};
use shipyard::deploy::{Reconciler, Sequencer};
use shipyard::scripts::{ScriptError, ScriptOps};
use shipyard::status::StatusAggregator;
use shipyard::store::{EntityStore, MemoryStore};
use shipyard::types::{AppName, BuildName};
use shipyard::workspace::Workspace;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("shipyard=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A build submission observed by the fake cluster.
#[derive(Debug, Clone)]
pub struct Submission {
    pub build_config: String,
    pub artifact: PathBuf,
    /// Entry names of the submitted tarball, read at submission time.
    pub entries: Vec<String>,
}

#[derive(Default)]
struct ClusterState {
    builds: HashMap<String, Vec<BuildSummary>>,
    deployments: HashMap<String, DeploymentSummary>,
    routes: HashMap<String, Vec<String>>,
    submissions: Vec<Submission>,
    deleted_builds: Vec<String>,
    deleted_deployments: Vec<String>,
    failing_apps: HashSet<String>,
    fail_start_build: bool,
    list_calls: usize,
}

/// Cluster fake keyed by application name.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<ClusterState>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_builds(&self, app: &str, builds: Vec<BuildSummary>) {
        self.state.lock().builds.insert(app.to_string(), builds);
    }

    pub fn set_build_running(&self, app: &str) {
        let build = BuildSummary {
            started_at: Some(Utc::now()),
            ..BuildSummary::pending(format!("{app}-deployment-build-1"))
        };
        self.set_builds(app, vec![build]);
    }

    pub fn set_build_finished(&self, app: &str, phase: Option<&str>) {
        let build = BuildSummary {
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
            phase: phase.map(str::to_string),
            ..BuildSummary::pending(format!("{app}-deployment-build-1"))
        };
        self.set_builds(app, vec![build]);
    }

    pub fn set_deployment(&self, app: &str, replicas: u32, ready: u32) {
        self.state.lock().deployments.insert(
            app.to_string(),
            DeploymentSummary {
                replicas: Some(replicas),
                ready_replicas: Some(ready),
            },
        );
    }

    pub fn set_running(&self, app: &str) {
        self.set_deployment(app, 1, 1);
    }

    pub fn set_routes(&self, app: &str, hosts: &[&str]) {
        self.state
            .lock()
            .routes
            .insert(app.to_string(), hosts.iter().map(|h| h.to_string()).collect());
    }

    /// Make every query for `app` fail.
    pub fn fail_app(&self, app: &str) {
        self.state.lock().failing_apps.insert(app.to_string());
    }

    pub fn fail_start_build(&self) {
        self.state.lock().fail_start_build = true;
    }

    /// Hold `list_builds` calls until the returned notifier fires.
    pub fn gate_list_builds(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock() = Some(notify.clone());
        notify
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().submissions.clone()
    }

    pub fn deleted_builds(&self) -> Vec<String> {
        self.state.lock().deleted_builds.clone()
    }

    pub fn deleted_deployments(&self) -> Vec<String> {
        self.state.lock().deleted_deployments.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    fn check(&self, app: &AppName) -> Result<(), ClusterError> {
        if self.state.lock().failing_apps.contains(app.as_str()) {
            return Err(ClusterError::CommandFailed {
                command: format!("query {app}"),
                stderr: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

fn tarball_entries(path: &Path) -> Vec<String> {
    let Ok(file) = std::fs::File::open(path) else {
        return Vec::new();
    };
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    let Ok(entries) = archive.entries() else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.header().entry_type().is_file())
        .filter_map(|e| {
            e.path()
                .ok()
                .map(|p| p.to_string_lossy().trim_start_matches("./").to_string())
        })
        .collect()
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn list_builds(&self, app: &AppName) -> Result<Vec<BuildSummary>, ClusterError> {
        self.state.lock().list_calls += 1;
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check(app)?;
        Ok(self
            .state
            .lock()
            .builds
            .get(app.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_builds(&self, app: &AppName) -> Result<(), ClusterError> {
        self.check(app)?;
        let mut state = self.state.lock();
        state.builds.remove(app.as_str());
        state.deleted_builds.push(app.to_string());
        Ok(())
    }

    async fn deployment(
        &self,
        app: &AppName,
    ) -> Result<Option<DeploymentSummary>, ClusterError> {
        self.check(app)?;
        Ok(self.state.lock().deployments.get(app.as_str()).copied())
    }

    async fn delete_deployments(&self, app: &AppName) -> Result<(), ClusterError> {
        self.check(app)?;
        let mut state = self.state.lock();
        state.deployments.remove(app.as_str());
        state.deleted_deployments.push(app.to_string());
        Ok(())
    }

    async fn routes(&self, app: &AppName) -> Result<Vec<String>, ClusterError> {
        self.check(app)?;
        Ok(self
            .state
            .lock()
            .routes
            .get(app.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn start_build(
        &self,
        build_config: &str,
        artifact: &Path,
    ) -> Result<BuildName, ClusterError> {
        let entries = tarball_entries(artifact);
        let mut state = self.state.lock();
        state.submissions.push(Submission {
            build_config: build_config.to_string(),
            artifact: artifact.to_path_buf(),
            entries,
        });
        if state.fail_start_build {
            return Err(ClusterError::CommandFailed {
                command: format!("start-build {build_config}"),
                stderr: "build config not found".to_string(),
            });
        }
        let name = format!("{build_config}-{}", state.submissions.len());
        let app = build_config
            .trim_end_matches("-deployment-build")
            .trim_end_matches("-update-build")
            .to_string();
        state
            .builds
            .entry(app)
            .or_default()
            .push(BuildSummary::pending(name.clone()));
        Ok(BuildName::new(name))
    }
}

/// Script fake that records invocations.
#[derive(Default)]
pub struct FakeScripts {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, script: &str) {
        self.failing.lock().insert(script.to_string());
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ScriptOps for FakeScripts {
    async fn run(&self, script: &str, args: &[String]) -> Result<(), ScriptError> {
        self.calls
            .lock()
            .push((script.to_string(), args.to_vec()));
        if self.failing.lock().contains(script) {
            return Err(ScriptError::Failed {
                script: script.to_string(),
                code: Some(1),
                stderr: "helm: release failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Lifecycle services over an in-memory store, fake cluster and temp workspace.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cluster: Arc<FakeCluster>,
    pub scripts: Arc<FakeScripts>,
    pub workspace: Workspace,
    pub catalog: Catalog,
    pub sequencer: Arc<Sequencer>,
    pub status: StatusAggregator,
    _root: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::wrapping(|store| store as Arc<dyn EntityStore>)
    }

    /// Services see the store returned by `wrap`; `store` stays the inner one.
    pub fn wrapping(wrap: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn EntityStore>) -> Self {
        init_tracing();
        let root = TempDir::new().unwrap();
        let workspace = Workspace::new(
            root.path().join("work"),
            root.path().join("scripts"),
            root.path().join("scripts/managed-chart.tgz"),
        );
        let store = Arc::new(MemoryStore::new());
        let cluster = Arc::new(FakeCluster::new());
        let scripts = Arc::new(FakeScripts::new());

        let dyn_store = wrap(store.clone());
        let dyn_cluster: Arc<dyn ClusterOps> = cluster.clone();
        let dyn_scripts: Arc<dyn ScriptOps> = scripts.clone();

        Self {
            catalog: Catalog::new(
                dyn_store.clone(),
                dyn_cluster.clone(),
                dyn_scripts.clone(),
                workspace.clone(),
            ),
            sequencer: Arc::new(Sequencer::new(
                dyn_store.clone(),
                dyn_cluster.clone(),
                dyn_scripts,
                workspace.clone(),
            )),
            status: StatusAggregator::new(dyn_store, dyn_cluster),
            store,
            cluster,
            scripts,
            workspace,
            _root: root,
        }
    }

    pub fn reconciler(&self, interval: Duration) -> Reconciler {
        Reconciler::new(self.store.clone(), self.cluster.clone(), interval)
    }

    /// Create `name` with a single plain archive.
    pub async fn app_with_archive(&self, name: &str) -> AppName {
        let app = self.catalog.create_app(name).await.unwrap().name;
        self.catalog
            .add_archive(&app, "app.war", &war_bytes(&[]))
            .await
            .unwrap();
        app
    }

    pub async fn records(&self, app: &AppName) -> Vec<shipyard::model::DeploymentRecord> {
        self.store.records(app).await.unwrap()
    }

    pub async fn open_count(&self, app: &AppName) -> usize {
        self.records(app).await.iter().filter(|r| r.is_open()).count()
    }
}

/// A zip archive containing a class file plus the given entries.
pub fn war_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("WEB-INF/classes/App.class", options).unwrap();
    zip.write_all(b"\xca\xfe\xba\xbe").unwrap();
    for (name, contents) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
