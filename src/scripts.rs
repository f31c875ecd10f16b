// ABOUTME: Runs the operator-supplied shell scripts for chart install, uninstall and login.
// ABOUTME: Scripts live in one directory and run from it; non-zero exit is fatal.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Installs the application's prerequisite chart. Args: app name, chart path.
pub const INSTALL_SCRIPT: &str = "install-chart.sh";
/// Removes the prerequisite chart. Args: app name.
pub const UNINSTALL_SCRIPT: &str = "uninstall-chart.sh";
/// Authenticates the cluster CLI. Args: server, token.
pub const LOGIN_SCRIPT: &str = "cluster-login.sh";

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("script not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to run {script}: {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{script} exited with status {code:?}: {stderr}")]
    Failed {
        script: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Executes a named script with arguments and waits for it.
#[async_trait]
pub trait ScriptOps: Send + Sync {
    async fn run(&self, script: &str, args: &[String]) -> Result<(), ScriptError>;
}

/// Runs scripts from a directory on the local machine.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    scripts_dir: PathBuf,
}

impl ScriptRunner {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
        }
    }

    pub fn script_path(&self, script: &str) -> PathBuf {
        self.scripts_dir.join(script)
    }
}

#[async_trait]
impl ScriptOps for ScriptRunner {
    async fn run(&self, script: &str, args: &[String]) -> Result<(), ScriptError> {
        let path = self.script_path(script);
        if !path.is_file() {
            return Err(ScriptError::NotFound(path));
        }

        tracing::info!(script, ?args, "running script");

        let output = Command::new(&path)
            .args(args)
            .current_dir(&self.scripts_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ScriptError::Spawn {
                script: script.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            tracing::debug!(script, "{}", line);
        }

        if !output.status.success() {
            tracing::warn!(script, code = ?output.status.code(), "script failed");
            return Err(ScriptError::Failed {
                script: script.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::info!(script, "script completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_script(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn missing_script_is_reported() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptRunner::new(dir.path());
        let err = runner.run(INSTALL_SCRIPT, &[]).await.unwrap_err();
        assert!(matches!(err, ScriptError::NotFound(_)));
    }

    #[tokio::test]
    async fn script_runs_in_scripts_dir_with_args() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "echo.sh", "echo \"$1\" > out.txt");
        let runner = ScriptRunner::new(dir.path());

        runner.run("echo.sh", &["demo".to_string()]).await.unwrap();

        let out = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), "demo");
    }

    #[tokio::test]
    async fn non_zero_exit_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "fail.sh", "echo boom >&2; exit 3");
        let runner = ScriptRunner::new(dir.path());

        match runner.run("fail.sh", &[]).await.unwrap_err() {
            ScriptError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
