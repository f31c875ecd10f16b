// ABOUTME: Read-only translation of cluster resource state into build and deployment states.
// ABOUTME: Every call re-queries the cluster; nothing is cached.

use std::sync::Arc;

use crate::cluster::{BuildSummary, ClusterError, ClusterOps, DeploymentSummary};
use crate::model::{BuildState, DeploymentState};
use crate::types::AppName;

/// Phases that mark a finished build as unsuccessful.
const FAILED_PHASES: &[&str] = &["Failed", "Error", "Cancelled"];

/// Queries the cluster and reports application state.
#[derive(Clone)]
pub struct Prober {
    cluster: Arc<dyn ClusterOps>,
}

impl Prober {
    pub fn new(cluster: Arc<dyn ClusterOps>) -> Self {
        Self { cluster }
    }

    pub async fn deployment_state(&self, app: &AppName) -> Result<DeploymentState, ClusterError> {
        let summary = self.cluster.deployment(app).await?;
        let state = translate_deployment_state(summary.as_ref());
        tracing::debug!(app = %app, state = %state, "probed deployment state");
        Ok(state)
    }

    pub async fn build_state(&self, app: &AppName) -> Result<BuildState, ClusterError> {
        let builds = self.cluster.list_builds(app).await?;
        let state = translate_build_state(&builds);
        tracing::debug!(app = %app, builds = builds.len(), state = %state, "probed build state");
        Ok(state)
    }

    pub async fn routes(&self, app: &AppName) -> Result<Vec<String>, ClusterError> {
        self.cluster.routes(app).await
    }
}

pub fn translate_deployment_state(summary: Option<&DeploymentSummary>) -> DeploymentState {
    match summary {
        None => DeploymentState::NotDeployed,
        Some(s) if s.is_ready() => DeploymentState::Running,
        Some(_) => DeploymentState::Deploying,
    }
}

/// Collapse the builds of one application into a single state.
///
/// Started-but-unfinished and pending builds win over everything else. Without
/// an explicit failure phase a finished build counts as completed, since
/// timestamps alone cannot tell success from failure.
pub fn translate_build_state(builds: &[BuildSummary]) -> BuildState {
    if builds.iter().any(|b| b.completed_at.is_none()) {
        return BuildState::Running;
    }
    if builds.is_empty() {
        return BuildState::NotRunning;
    }
    let failed = builds.iter().any(|b| {
        b.phase
            .as_deref()
            .is_some_and(|phase| FAILED_PHASES.contains(&phase))
    });
    if failed {
        BuildState::Failed
    } else {
        BuildState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn finished(name: &str, phase: Option<&str>) -> BuildSummary {
        BuildSummary {
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
            phase: phase.map(str::to_string),
            ..BuildSummary::pending(name)
        }
    }

    fn started(name: &str) -> BuildSummary {
        BuildSummary {
            started_at: Some(Utc::now()),
            ..BuildSummary::pending(name)
        }
    }

    #[test]
    fn no_builds_is_not_running() {
        assert_eq!(translate_build_state(&[]), BuildState::NotRunning);
    }

    #[test]
    fn started_build_is_running() {
        assert_eq!(
            translate_build_state(&[finished("a", None), started("b")]),
            BuildState::Running
        );
    }

    #[test]
    fn pending_build_is_running() {
        assert_eq!(
            translate_build_state(&[BuildSummary::pending("a")]),
            BuildState::Running
        );
    }

    #[test]
    fn finished_builds_without_phase_are_completed() {
        assert_eq!(
            translate_build_state(&[finished("a", None), finished("b", None)]),
            BuildState::Completed
        );
    }

    #[test]
    fn failed_phase_is_failed() {
        assert_eq!(
            translate_build_state(&[finished("a", Some("Complete")), finished("b", Some("Failed"))]),
            BuildState::Failed
        );
    }

    #[test]
    fn running_wins_over_failed() {
        assert_eq!(
            translate_build_state(&[finished("a", Some("Error")), started("b")]),
            BuildState::Running
        );
    }

    #[test]
    fn deployment_translation() {
        assert_eq!(translate_deployment_state(None), DeploymentState::NotDeployed);
        let ready = DeploymentSummary {
            replicas: Some(1),
            ready_replicas: Some(1),
        };
        let rolling = DeploymentSummary {
            replicas: Some(3),
            ready_replicas: Some(1),
        };
        assert_eq!(translate_deployment_state(Some(&ready)), DeploymentState::Running);
        assert_eq!(translate_deployment_state(Some(&rolling)), DeploymentState::Deploying);

        let scaled_down = DeploymentSummary {
            replicas: Some(0),
            ready_replicas: None,
        };
        assert_eq!(
            translate_deployment_state(Some(&scaled_down)),
            DeploymentState::Running
        );
    }
}
