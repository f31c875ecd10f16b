// ABOUTME: ClusterOps implementation that drives the orchestrator's command-line client.
// ABOUTME: Every query requests JSON output and parses only the fields it needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{BuildSummary, ClusterError, ClusterOps, DeploymentSummary};
use crate::types::{AppName, BuildName};

/// Cluster client backed by `oc` (or a compatible CLI).
#[derive(Debug, Clone)]
pub struct CliCluster {
    program: String,
    namespace: Option<String>,
}

impl CliCluster {
    pub fn new(program: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            program: program.into(),
            namespace,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, ClusterError> {
        let mut command = Command::new(&self.program);
        if let Some(ns) = &self.namespace {
            command.arg("-n").arg(ns);
        }
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(program = %self.program, ?args, "running cluster command");

        let output = command.output().await.map_err(|source| ClusterError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ClusterError::CommandFailed {
                command: format!("{} {}", self.program, args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ClusterOps for CliCluster {
    async fn list_builds(&self, app: &AppName) -> Result<Vec<BuildSummary>, ClusterError> {
        let selector = app.label_selector();
        let json = self
            .run(&["get", "builds", "-l", &selector, "-o", "json"])
            .await?;
        parse_builds(&json)
    }

    async fn delete_builds(&self, app: &AppName) -> Result<(), ClusterError> {
        let selector = app.label_selector();
        self.run(&["delete", "builds", "-l", &selector, "--ignore-not-found"])
            .await?;
        Ok(())
    }

    async fn deployment(
        &self,
        app: &AppName,
    ) -> Result<Option<DeploymentSummary>, ClusterError> {
        let field = format!("metadata.name={app}");
        let json = self
            .run(&[
                "get",
                "deployments",
                "--field-selector",
                &field,
                "-o",
                "json",
            ])
            .await?;
        parse_deployment(&json)
    }

    async fn delete_deployments(&self, app: &AppName) -> Result<(), ClusterError> {
        let selector = app.label_selector();
        self.run(&["delete", "deployments", "-l", &selector, "--ignore-not-found"])
            .await?;
        Ok(())
    }

    async fn routes(&self, app: &AppName) -> Result<Vec<String>, ClusterError> {
        let selector = app.label_selector();
        let json = self
            .run(&["get", "routes", "-l", &selector, "-o", "json"])
            .await?;
        parse_routes(&json)
    }

    async fn start_build(
        &self,
        build_config: &str,
        artifact: &Path,
    ) -> Result<BuildName, ClusterError> {
        let from = format!("--from-archive={}", artifact.display());
        let out = self
            .run(&["start-build", build_config, &from, "-o", "name"])
            .await?;
        parse_build_name(&out)
    }
}

#[derive(Debug, Deserialize)]
struct List<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Build {
    metadata: Metadata,
    #[serde(default)]
    status: BuildStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildStatus {
    phase: Option<String>,
    start_timestamp: Option<DateTime<Utc>>,
    completion_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Deployment {
    #[serde(default)]
    spec: DeploymentSpec,
    #[serde(default)]
    status: DeploymentStatus,
}

#[derive(Debug, Default, Deserialize)]
struct DeploymentSpec {
    replicas: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentStatus {
    ready_replicas: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Route {
    spec: RouteSpec,
}

#[derive(Debug, Deserialize)]
struct RouteSpec {
    host: Option<String>,
}

fn parse_builds(json: &str) -> Result<Vec<BuildSummary>, ClusterError> {
    let list: List<Build> = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|b| BuildSummary {
            name: BuildName::new(b.metadata.name),
            started_at: b.status.start_timestamp,
            completed_at: b.status.completion_timestamp,
            phase: b.status.phase,
        })
        .collect())
}

fn parse_deployment(json: &str) -> Result<Option<DeploymentSummary>, ClusterError> {
    let list: List<Deployment> = serde_json::from_str(json)?;
    Ok(list.items.into_iter().next().map(|d| DeploymentSummary {
        replicas: d.spec.replicas,
        ready_replicas: d.status.ready_replicas,
    }))
}

fn parse_routes(json: &str) -> Result<Vec<String>, ClusterError> {
    let list: List<Route> = serde_json::from_str(json)?;
    Ok(list.items.into_iter().filter_map(|r| r.spec.host).collect())
}

/// `start-build -o name` prints `build.build.openshift.io/<name>`.
fn parse_build_name(output: &str) -> Result<BuildName, ClusterError> {
    let line = output.trim();
    let name = line.rsplit('/').next().unwrap_or(line);
    if name.is_empty() {
        return Err(ClusterError::MissingBuildName);
    }
    Ok(BuildName::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_list() {
        let json = r#"{
            "kind": "List",
            "items": [
                {
                    "metadata": {"name": "demo-deployment-build-1"},
                    "status": {
                        "phase": "Complete",
                        "startTimestamp": "2026-01-01T10:00:00Z",
                        "completionTimestamp": "2026-01-01T10:05:00Z"
                    }
                },
                {
                    "metadata": {"name": "demo-deployment-build-2"},
                    "status": {"phase": "New"}
                }
            ]
        }"#;

        let builds = parse_builds(json).unwrap();
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].name.as_str(), "demo-deployment-build-1");
        assert!(builds[0].started_at.is_some());
        assert!(builds[0].completed_at.is_some());
        assert_eq!(builds[1].phase.as_deref(), Some("New"));
        assert!(builds[1].started_at.is_none());
    }

    #[test]
    fn empty_list_has_no_deployment() {
        let json = r#"{"kind": "List", "items": []}"#;
        assert_eq!(parse_deployment(json).unwrap(), None);
    }

    #[test]
    fn parses_replica_counts() {
        let json = r#"{"items": [{"spec": {"replicas": 2}, "status": {"readyReplicas": 1}}]}"#;
        assert_eq!(
            parse_deployment(json).unwrap(),
            Some(DeploymentSummary {
                replicas: Some(2),
                ready_replicas: Some(1)
            })
        );
    }

    #[test]
    fn routes_without_host_are_skipped() {
        let json = r#"{"items": [
            {"spec": {"host": "demo.apps.example.com"}},
            {"spec": {}}
        ]}"#;
        assert_eq!(parse_routes(json).unwrap(), vec!["demo.apps.example.com"]);
    }

    #[test]
    fn build_name_prefix_is_stripped() {
        let name = parse_build_name("build.build.openshift.io/demo-deployment-build-3\n").unwrap();
        assert_eq!(name.as_str(), "demo-deployment-build-3");
    }

    #[test]
    fn blank_start_build_output_is_an_error() {
        assert!(matches!(
            parse_build_name("  \n"),
            Err(ClusterError::MissingBuildName)
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(parse_builds("nope"), Err(ClusterError::Parse(_))));
    }
}
