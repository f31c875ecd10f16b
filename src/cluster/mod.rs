// ABOUTME: Cluster orchestrator operations used by the deployment lifecycle.
// ABOUTME: Builds, deployments and routes are always addressed by the application label.

mod cli;

pub use cli::CliCluster;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::types::{AppName, BuildName};

/// Summary of one build resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub name: BuildName,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Phase as reported by the orchestrator, when it reports one.
    pub phase: Option<String>,
}

impl BuildSummary {
    /// A build that has been created but not yet started or finished.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: BuildName::new(name),
            started_at: None,
            completed_at: None,
            phase: None,
        }
    }
}

/// Replica counts of an application's deployment resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub replicas: Option<u32>,
    pub ready_replicas: Option<u32>,
}

impl DeploymentSummary {
    /// Every desired replica is ready.
    ///
    /// The orchestrator omits a ready count of zero, so a missing count is
    /// read as 0. A deployment scaled to zero is therefore ready.
    pub fn is_ready(&self) -> bool {
        self.replicas.unwrap_or(0) == self.ready_replicas.unwrap_or(0)
    }
}

/// Errors from the cluster client.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("failed to run cluster CLI '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cluster command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("unexpected cluster response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cluster returned no build name")]
    MissingBuildName,
}

/// Operations against the cluster orchestrator.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// All build resources labeled for the application.
    async fn list_builds(&self, app: &AppName) -> Result<Vec<BuildSummary>, ClusterError>;

    /// Delete every build resource labeled for the application. Idempotent.
    async fn delete_builds(&self, app: &AppName) -> Result<(), ClusterError>;

    /// The application's deployment resource, if one exists.
    async fn deployment(&self, app: &AppName)
    -> Result<Option<DeploymentSummary>, ClusterError>;

    /// Delete every deployment resource labeled for the application. Idempotent.
    async fn delete_deployments(&self, app: &AppName) -> Result<(), ClusterError>;

    /// Hostnames routed to the application.
    async fn routes(&self, app: &AppName) -> Result<Vec<String>, ClusterError>;

    /// Start a build of `build_config` from the packaged artifact.
    async fn start_build(
        &self,
        build_config: &str,
        artifact: &Path,
    ) -> Result<BuildName, ClusterError>;
}

/// Build config used for a first or full deployment.
pub fn deployment_build_config(app: &AppName) -> String {
    format!("{app}-deployment-build")
}

/// Build config used to refresh an already running application.
pub fn update_build_config(app: &AppName) -> String {
    format!("{app}-update-build")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_config_names() {
        let app = AppName::new("demo").unwrap();
        assert_eq!(deployment_build_config(&app), "demo-deployment-build");
        assert_eq!(update_build_config(&app), "demo-update-build");
    }

    #[test]
    fn readiness_compares_counts() {
        let ready = DeploymentSummary {
            replicas: Some(2),
            ready_replicas: Some(2),
        };
        let scaling = DeploymentSummary {
            replicas: Some(2),
            ready_replicas: Some(1),
        };
        let unreported = DeploymentSummary {
            replicas: Some(1),
            ready_replicas: None,
        };
        assert!(ready.is_ready());
        assert!(!scaling.is_ready());
        assert!(!unreported.is_ready());
        assert!(DeploymentSummary::default().is_ready());
    }

    #[test]
    fn scaled_to_zero_without_ready_count_is_ready() {
        let idle = DeploymentSummary {
            replicas: Some(0),
            ready_replicas: None,
        };
        assert!(idle.is_ready());
    }
}
