// ABOUTME: The deploy sequence: validate, lock, install prerequisites, stage, package and submit.
// ABOUTME: Also cancels builds and stops applications on the cluster.

use nonempty::NonEmpty;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{DeployError, LockManager};
use crate::cluster::{self, ClusterOps};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::model::{Application, BuildState, DeploymentRecord, DeploymentState, DeploymentStatus};
use crate::probe::Prober;
use crate::scripts::{INSTALL_SCRIPT, ScriptOps};
use crate::staging::{self, StagedFiles};
use crate::store::EntityStore;
use crate::types::{AppName, BuildName};
use crate::workspace::Workspace;

/// Options for a deploy request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Cancel an in-flight deployment instead of failing.
    pub force: bool,
    /// Rebuild a running application with the update build config.
    pub refresh: bool,
}

/// Result of a successful build submission.
#[derive(Debug)]
pub struct Submitted {
    pub build: BuildName,
    pub record: DeploymentRecord,
    /// The attempt that was cancelled to make room for this one.
    pub cancelled: Option<DeploymentRecord>,
    pub diagnostics: Diagnostics,
}

/// Drives deployments of applications onto the cluster.
pub struct Sequencer {
    store: Arc<dyn EntityStore>,
    locks: LockManager,
    prober: Prober,
    cluster: Arc<dyn ClusterOps>,
    scripts: Arc<dyn ScriptOps>,
    workspace: Workspace,
}

impl Sequencer {
    pub fn new(
        store: Arc<dyn EntityStore>,
        cluster: Arc<dyn ClusterOps>,
        scripts: Arc<dyn ScriptOps>,
        workspace: Workspace,
    ) -> Self {
        Self {
            locks: LockManager::new(store.clone()),
            prober: Prober::new(cluster.clone()),
            store,
            cluster,
            scripts,
            workspace,
        }
    }

    async fn load(&self, name: &AppName) -> Result<Application, DeployError> {
        self.store
            .application(name)
            .await?
            .ok_or_else(|| DeployError::ApplicationNotFound {
                name: name.to_string(),
            })
    }

    /// Deploy `name`, returning the submitted build.
    ///
    /// Validation failures return before any record is created. Once the lock
    /// is held, any failure closes the new record as FAILED before returning.
    pub async fn deploy(
        &self,
        name: &AppName,
        options: DeployOptions,
    ) -> Result<Submitted, DeployError> {
        let app = self.load(name).await?;

        let Some(archives) = NonEmpty::from_vec(app.archives.clone()) else {
            return Err(DeployError::NoArchives {
                app: name.to_string(),
            });
        };

        if options.refresh {
            let state = self.prober.deployment_state(name).await?;
            if state != DeploymentState::Running {
                return Err(DeployError::RefreshNotRunning {
                    app: name.to_string(),
                    state,
                });
            }
        }

        let mut cancelled = None;
        if let Some(open) = self.locks.find_open_record(name).await? {
            if !options.force {
                return Err(DeployError::LockHeld {
                    app: name.to_string(),
                    record: Box::new(open),
                });
            }
            cancelled = self.locks.force_cancel(name).await?;
        }

        let record = self.locks.open(name).await?;
        tracing::info!(
            app = %name,
            record = %record.id,
            archives = archives.len(),
            refresh = options.refresh,
            "starting deployment"
        );

        let mut diagnostics = Diagnostics::default();
        match self.build(&app, &record, options, &mut diagnostics).await {
            Ok(build) => {
                tracing::info!(app = %name, build = %build, "build submitted");
                let record = self
                    .store
                    .open_record(name)
                    .await?
                    .filter(|r| r.id == record.id)
                    .unwrap_or(record);
                Ok(Submitted {
                    build,
                    record,
                    cancelled,
                    diagnostics,
                })
            }
            Err(e) => {
                tracing::warn!(app = %name, record = %record.id, error = %e, "deployment failed");
                if let Err(finalize) = self.locks.finalize(&record.id, DeploymentStatus::Failed).await
                {
                    tracing::error!(
                        app = %name,
                        record = %record.id,
                        error = %finalize,
                        "could not mark failed deployment"
                    );
                }
                Err(e)
            }
        }
    }

    /// Steps run while the lock is held.
    async fn build(
        &self,
        app: &Application,
        record: &DeploymentRecord,
        options: DeployOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<BuildName, DeployError> {
        let name = &app.name;
        self.scripts
            .run(
                INSTALL_SCRIPT,
                &[
                    name.to_string(),
                    self.workspace.chart().display().to_string(),
                ],
            )
            .await?;

        self.cluster.delete_builds(name).await?;

        let dir = self
            .workspace
            .app_dir(name)
            .map_err(|source| DeployError::Workspace {
                path: self.workspace.app_path(name),
                source,
            })?;

        let mut staged = StagedFiles::default();
        let mut artifact = None;
        let submitted = self
            .stage_and_submit(app, &dir, options, &mut staged, &mut artifact)
            .await;

        if let Some(path) = &artifact {
            diagnostics.remove_file(path, WarningKind::ArtifactCleanup);
        }
        for path in staged.paths() {
            diagnostics.remove_file(path, WarningKind::StagedFileCleanup);
        }

        let build = submitted?;
        if let Err(e) = self.locks.mark_build_triggered(&record.id).await {
            tracing::error!(
                app = %name,
                record = %record.id,
                build = %build,
                error = %e,
                "build submitted but not recorded; it keeps running on the cluster"
            );
            return Err(DeployError::BuildNotRecorded {
                app: name.to_string(),
                build,
                source: Box::new(e),
            });
        }
        Ok(build)
    }

    async fn stage_and_submit(
        &self,
        app: &Application,
        dir: &Path,
        options: DeployOptions,
        staged: &mut StagedFiles,
        artifact: &mut Option<PathBuf>,
    ) -> Result<BuildName, DeployError> {
        staging::materialize(app, dir, staged)?;
        let path = staging::package_dir(dir)?;
        let path = artifact.insert(path);

        let build_config = if options.refresh {
            cluster::update_build_config(&app.name)
        } else {
            cluster::deployment_build_config(&app.name)
        };
        Ok(self.cluster.start_build(&build_config, path).await?)
    }

    /// Remove the application's builds and cancel its open attempt, if any.
    pub async fn cancel_build(
        &self,
        name: &AppName,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        self.load(name).await?;
        self.cluster.delete_builds(name).await?;
        self.locks.force_cancel(name).await
    }

    /// Remove the application's builds and deployments from the cluster.
    ///
    /// Returns the build state observed before anything was deleted. Records
    /// are not touched; see [`Sequencer::stop_and_record`].
    pub async fn stop(&self, name: &AppName) -> Result<BuildState, DeployError> {
        self.load(name).await?;
        let state = self.prober.build_state(name).await?;
        self.cluster.delete_builds(name).await?;
        self.cluster.delete_deployments(name).await?;
        tracing::info!(app = %name, build_state = %state, "stopped application");
        Ok(state)
    }

    /// Stop the application and cancel its open attempt unless the build had
    /// already finished.
    pub async fn stop_and_record(
        &self,
        name: &AppName,
    ) -> Result<(BuildState, Option<DeploymentRecord>), DeployError> {
        let state = self.stop(name).await?;
        let cancelled = match state {
            BuildState::Running | BuildState::NotRunning => self.locks.force_cancel(name).await?,
            BuildState::Completed | BuildState::Failed => None,
        };
        Ok((state, cancelled))
    }
}
