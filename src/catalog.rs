// ABOUTME: Application catalog: create, inspect and modify applications and their archives.
// ABOUTME: Every mutation of archives, config or databases is refused while a deploy is in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cluster::ClusterOps;
use crate::deploy::{DeployError, LockManager};
use crate::model::{
    Application, Archive, BuildState, ConfigFiles, ConfigKind, DatabaseConnection,
    DeploymentRecord, DeploymentState,
};
use crate::probe::Prober;
use crate::scripts::{ScriptOps, UNINSTALL_SCRIPT};
use crate::store::{EntityStore, StoreError};
use crate::types::AppName;
use crate::workspace::Workspace;

/// Only web archives can be deployed.
const ARCHIVE_EXTENSION: &str = ".war";

pub struct Catalog {
    store: Arc<dyn EntityStore>,
    locks: LockManager,
    prober: Prober,
    cluster: Arc<dyn ClusterOps>,
    scripts: Arc<dyn ScriptOps>,
    workspace: Workspace,
}

impl Catalog {
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

    pub async fn create_app(&self, name: &str) -> Result<Application, DeployError> {
        let name = AppName::new(name)?;
        let app = Application::new(name);
        self.store.create_application(app.clone()).await?;
        tracing::info!(app = %app.name, "created application");
        Ok(app)
    }

    pub async fn get_app(&self, name: &AppName) -> Result<Application, DeployError> {
        self.store
            .application(name)
            .await?
            .ok_or_else(|| DeployError::ApplicationNotFound {
                name: name.to_string(),
            })
    }

    pub async fn list_apps(&self) -> Result<Vec<Application>, DeployError> {
        Ok(self.store.applications().await?)
    }

    /// Apply `edit` to the stored application under the store's write lock.
    ///
    /// The open-deployment check, the edit and the save happen as one step, so
    /// concurrent edits cannot lose each other's changes. An error from `edit`
    /// abandons the change.
    async fn modify<T: Send>(
        &self,
        name: &AppName,
        edit: impl FnOnce(&mut Application) -> Result<T, DeployError> + Send,
    ) -> Result<T, DeployError> {
        let mut outcome = None;
        let applied = self
            .store
            .update_application(
                name,
                Box::new(|app: &mut Application| {
                    let result = edit(app);
                    let keep = result.is_ok();
                    outcome = Some(result);
                    keep
                }),
            )
            .await;

        match applied {
            Ok(_) => {}
            Err(StoreError::LockHeld { app, record }) => {
                return Err(DeployError::ModificationLocked { app, record });
            }
            Err(e) => return Err(e.into()),
        }
        outcome.unwrap_or_else(|| {
            Err(DeployError::ApplicationNotFound {
                name: name.to_string(),
            })
        })
    }

    /// Archives of the application, sorted by file name.
    pub async fn list_archives(&self, name: &AppName) -> Result<Vec<Archive>, DeployError> {
        let mut archives = self.get_app(name).await?.archives;
        archives.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(archives)
    }

    pub async fn add_archive(
        &self,
        name: &AppName,
        file_name: &str,
        contents: &[u8],
    ) -> Result<Archive, DeployError> {
        check_archive_name(file_name)?;
        let config_files = inspect_archive(file_name, contents)?;
        let workspace = &self.workspace;
        let archive = self
            .modify(name, |app| {
                if app.archive(file_name).is_some() {
                    return Err(DeployError::ArchiveExists {
                        app: name.to_string(),
                        file_name: file_name.to_string(),
                    });
                }
                let dir = app_dir(workspace, name)?;
                store_archive(app, &dir, file_name, contents, config_files)
            })
            .await?;
        tracing::info!(app = %name, archive = file_name, "stored archive");
        Ok(archive)
    }

    pub async fn replace_archive(
        &self,
        name: &AppName,
        file_name: &str,
        contents: &[u8],
    ) -> Result<Archive, DeployError> {
        check_archive_name(file_name)?;
        let config_files = inspect_archive(file_name, contents)?;
        let workspace = &self.workspace;
        let archive = self
            .modify(name, |app| {
                if app.archive(file_name).is_none() {
                    return Err(DeployError::ArchiveNotFound {
                        app: name.to_string(),
                        file_name: file_name.to_string(),
                    });
                }
                let dir = app_dir(workspace, name)?;
                store_archive(app, &dir, file_name, contents, config_files)
            })
            .await?;
        tracing::info!(app = %name, archive = file_name, "replaced archive");
        Ok(archive)
    }

    pub async fn remove_archive(&self, name: &AppName, file_name: &str) -> Result<(), DeployError> {
        let path = self.workspace.app_path(name).join(file_name);
        self.modify(name, |app| {
            let Some(index) = app.archives.iter().position(|a| a.file_name == file_name) else {
                return Err(DeployError::ArchiveNotFound {
                    app: name.to_string(),
                    file_name: file_name.to_string(),
                });
            };
            match std::fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    return Err(DeployError::Workspace { path, source: e });
                }
                _ => {}
            }
            app.archives.remove(index);
            app.touch_archives();
            Ok(())
        })
        .await?;
        tracing::info!(app = %name, archive = file_name, "removed archive");
        Ok(())
    }

    /// The application-level blob of `kind`, if set.
    pub async fn config(
        &self,
        name: &AppName,
        kind: ConfigKind,
    ) -> Result<Option<String>, DeployError> {
        let app = self.get_app(name).await?;
        Ok(app.configs.get(kind).map(str::to_string))
    }

    pub async fn set_config(
        &self,
        name: &AppName,
        kind: ConfigKind,
        contents: String,
    ) -> Result<(), DeployError> {
        self.modify(name, |app| {
            app.configs.set(kind, contents);
            app.touch_config();
            Ok(())
        })
        .await?;
        tracing::info!(app = %name, %kind, "set config");
        Ok(())
    }

    /// Remove the blob of `kind`. Returns whether one was set.
    pub async fn clear_config(&self, name: &AppName, kind: ConfigKind) -> Result<bool, DeployError> {
        let cleared = self
            .modify(name, |app| {
                let cleared = app.configs.clear(kind).is_some();
                if cleared {
                    app.touch_config();
                }
                Ok(cleared)
            })
            .await?;
        if cleared {
            tracing::info!(app = %name, %kind, "cleared config");
        }
        Ok(cleared)
    }

    pub async fn list_databases(
        &self,
        name: &AppName,
    ) -> Result<Vec<DatabaseConnection>, DeployError> {
        Ok(self.get_app(name).await?.databases)
    }

    pub async fn add_database(
        &self,
        name: &AppName,
        connection: DatabaseConnection,
    ) -> Result<(), DeployError> {
        let jndi_name = connection.jndi_name.clone();
        self.modify(name, |app| {
            if app.databases.iter().any(|d| d.jndi_name == connection.jndi_name) {
                return Err(DeployError::DatabaseExists {
                    app: name.to_string(),
                    jndi_name: connection.jndi_name,
                });
            }
            app.databases.push(connection);
            app.touch_config();
            Ok(())
        })
        .await?;
        tracing::info!(app = %name, jndi = %jndi_name, "added database connection");
        Ok(())
    }

    pub async fn remove_database(&self, name: &AppName, jndi_name: &str) -> Result<(), DeployError> {
        self.modify(name, |app| {
            let before = app.databases.len();
            app.databases.retain(|d| d.jndi_name != jndi_name);
            if app.databases.len() == before {
                return Err(DeployError::DatabaseNotFound {
                    app: name.to_string(),
                    jndi_name: jndi_name.to_string(),
                });
            }
            app.touch_config();
            Ok(())
        })
        .await?;
        tracing::info!(app = %name, jndi = jndi_name, "removed database connection");
        Ok(())
    }

    /// Deployment attempts of the application, newest first.
    pub async fn history(&self, name: &AppName) -> Result<Vec<DeploymentRecord>, DeployError> {
        self.get_app(name).await?;
        Ok(self.store.records(name).await?)
    }

    /// Delete the application from the cluster and locally.
    ///
    /// Without `force`, refuses while a deploy is in flight or the application
    /// is deployed or building.
    pub async fn delete_app(&self, name: &AppName, force: bool) -> Result<(), DeployError> {
        self.get_app(name).await?;

        if !force {
            self.locks.ensure_can_modify(name).await?;
            let deployment = self.prober.deployment_state(name).await?;
            let build = self.prober.build_state(name).await?;
            if deployment != DeploymentState::NotDeployed || build == BuildState::Running {
                return Err(DeployError::ApplicationActive {
                    app: name.to_string(),
                    deployment,
                    build,
                });
            }
        }

        self.cluster.delete_builds(name).await?;
        self.cluster.delete_deployments(name).await?;
        self.scripts
            .run(UNINSTALL_SCRIPT, &[name.to_string()])
            .await?;
        self.workspace
            .remove_app_dir(name)
            .map_err(|source| DeployError::Workspace {
                path: self.workspace.app_path(name),
                source,
            })?;
        self.store.delete_application(name).await?;

        tracing::info!(app = %name, force, "deleted application");
        Ok(())
    }
}

fn app_dir(workspace: &Workspace, name: &AppName) -> Result<PathBuf, DeployError> {
    workspace
        .app_dir(name)
        .map_err(|source| DeployError::Workspace {
            path: workspace.app_path(name),
            source,
        })
}

fn inspect_archive(file_name: &str, contents: &[u8]) -> Result<ConfigFiles, DeployError> {
    ConfigFiles::inspect(contents).map_err(|source| DeployError::InvalidArchive {
        file_name: file_name.to_string(),
        source,
    })
}

/// Write the archive into `dir` and record it on `app`.
///
/// Refuses if another archive already supplies one of its config kinds.
fn store_archive(
    app: &mut Application,
    dir: &Path,
    file_name: &str,
    contents: &[u8],
    config_files: ConfigFiles,
) -> Result<Archive, DeployError> {
    for kind in config_files.kinds() {
        if let Some(existing) = app.archive_supplying(kind, file_name) {
            return Err(DeployError::DuplicateConfigKind {
                app: app.name.to_string(),
                file_name: file_name.to_string(),
                kind,
                existing: existing.file_name.clone(),
            });
        }
    }

    let path = dir.join(file_name);
    std::fs::write(&path, contents).map_err(|source| DeployError::Workspace { path, source })?;

    let archive = Archive::new(file_name, config_files);
    match app.archives.iter_mut().find(|a| a.file_name == file_name) {
        Some(existing) => *existing = archive.clone(),
        None => app.archives.push(archive.clone()),
    }
    app.touch_archives();
    Ok(archive)
}

/// Archive names are plain `.war` file names.
fn check_archive_name(file_name: &str) -> Result<(), DeployError> {
    let plain = Path::new(file_name).file_name().and_then(|n| n.to_str()) == Some(file_name);
    if !plain || !file_name.ends_with(ARCHIVE_EXTENSION) || file_name.len() == ARCHIVE_EXTENSION.len()
    {
        return Err(DeployError::UnsupportedArchive {
            file_name: file_name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names() {
        assert!(check_archive_name("app.war").is_ok());
        assert!(check_archive_name("app.jar").is_err());
        assert!(check_archive_name(".war").is_err());
        assert!(check_archive_name("../app.war").is_err());
        assert!(check_archive_name("dir/app.war").is_err());
    }
}
