// ABOUTME: Combines probed cluster state with local change timestamps into one status view.
// ABOUTME: Staged changes are edits made after the start of the latest completed deployment.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::cluster::ClusterOps;
use crate::deploy::DeployError;
use crate::model::{AppState, BuildState, DeploymentRecord, DeploymentState, StageState};
use crate::probe::Prober;
use crate::store::EntityStore;
use crate::types::AppName;

pub struct StatusAggregator {
    store: Arc<dyn EntityStore>,
    prober: Prober,
}

impl StatusAggregator {
    pub fn new(store: Arc<dyn EntityStore>, cluster: Arc<dyn ClusterOps>) -> Self {
        Self {
            store,
            prober: Prober::new(cluster),
        }
    }

    pub async fn status(&self, name: &AppName) -> Result<AppState, DeployError> {
        let app = self
            .store
            .application(name)
            .await?
            .ok_or_else(|| DeployError::ApplicationNotFound {
                name: name.to_string(),
            })?;

        let deployment_state = self.prober.deployment_state(name).await?;
        let build_state = normalize_build_state(
            self.prober.build_state(name).await?,
            deployment_state,
        );

        let stage_state = if deployment_state == DeploymentState::NotDeployed {
            StageState::UpToDate
        } else {
            let latest = self.store.latest_completed_record(name).await?;
            stage_state(
                latest.as_ref(),
                app.last_archive_change,
                app.last_config_change,
            )
        };

        Ok(AppState {
            deployment_state,
            build_state,
            stage_state,
        })
    }

    /// Hostnames routed to the application.
    pub async fn routes(&self, name: &AppName) -> Result<Vec<String>, DeployError> {
        if self.store.application(name).await?.is_none() {
            return Err(DeployError::ApplicationNotFound {
                name: name.to_string(),
            });
        }
        Ok(self.prober.routes(name).await?)
    }
}

/// A completed build with nothing deployed is reported as not running.
pub fn normalize_build_state(build: BuildState, deployment: DeploymentState) -> BuildState {
    if build == BuildState::Completed && deployment == DeploymentState::NotDeployed {
        BuildState::NotRunning
    } else {
        build
    }
}

/// Stage state of a deployed application given its latest completed record.
pub fn stage_state(
    latest_completed: Option<&DeploymentRecord>,
    last_archive_change: DateTime<Utc>,
    last_config_change: DateTime<Utc>,
) -> StageState {
    match latest_completed {
        Some(record)
            if last_archive_change <= record.start_time
                && last_config_change <= record.start_time =>
        {
            StageState::UpToDate
        }
        _ => StageState::StagedChanges,
    }
}
