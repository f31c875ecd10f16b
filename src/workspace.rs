// ABOUTME: Local filesystem layout: per-application staging directories and the script directory.
// ABOUTME: Archives are stored in the application's directory, which is packaged as the build input.

use std::io;
use std::path::{Path, PathBuf};

use crate::types::AppName;

#[derive(Debug, Clone)]
pub struct Workspace {
    work_dir: PathBuf,
    scripts_dir: PathBuf,
    chart: PathBuf,
}

impl Workspace {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        scripts_dir: impl Into<PathBuf>,
        chart: impl Into<PathBuf>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            scripts_dir: scripts_dir.into(),
            chart: chart.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Chart passed to the prerequisite install script.
    pub fn chart(&self) -> &Path {
        &self.chart
    }

    /// Staging directory of `app`. Not created.
    pub fn app_path(&self, app: &AppName) -> PathBuf {
        self.work_dir.join(app.as_str())
    }

    /// Staging directory of `app`, created if missing.
    pub fn app_dir(&self, app: &AppName) -> io::Result<PathBuf> {
        let dir = self.app_path(app);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove the staging directory of `app` and everything in it.
    pub fn remove_app_dir(&self, app: &AppName) -> io::Result<()> {
        match std::fs::remove_dir_all(self.app_path(app)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
