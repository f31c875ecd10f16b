// ABOUTME: Computed application status as observed on the cluster.
// ABOUTME: Never persisted; recomputed on every status query.

use serde::Serialize;
use std::fmt;

/// Whether the application is running on the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    NotDeployed,
    Deploying,
    Running,
}

/// Aggregate state of the application's build resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildState {
    NotRunning,
    Running,
    Completed,
    Failed,
}

impl BuildState {
    /// Terminal states end the deployment attempt that triggered the build.
    pub fn is_done(&self) -> bool {
        matches!(self, BuildState::Completed | BuildState::Failed)
    }
}

/// Whether local edits have been deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageState {
    UpToDate,
    StagedChanges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppState {
    pub deployment_state: DeploymentState,
    pub build_state: BuildState,
    pub stage_state: StageState,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeploymentState::NotDeployed => "NOT_DEPLOYED",
            DeploymentState::Deploying => "DEPLOYING",
            DeploymentState::Running => "RUNNING",
        })
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildState::NotRunning => "NOT_RUNNING",
            BuildState::Running => "RUNNING",
            BuildState::Completed => "COMPLETED",
            BuildState::Failed => "FAILED",
        })
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageState::UpToDate => "UP_TO_DATE",
            StageState::StagedChanges => "STAGED_CHANGES",
        })
    }
}
