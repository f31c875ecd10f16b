// ABOUTME: Configuration types and parsing for shipyard.yml.
// ABOUTME: Handles YAML parsing, file discovery and resolution of relative paths.

mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::init_config;

use crate::deploy::DEFAULT_POLL_INTERVAL;
use crate::error::{Error, Result};
use crate::workspace::Workspace;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "shipyard.yml";
pub const CONFIG_FILENAME_ALT: &str = "shipyard.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".shipyard/config.yml";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SHIPYARD_CONFIG";

const DEFAULT_CHART: &str = "managed-chart.tgz";
const DEFAULT_STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub work_dir: PathBuf,

    pub scripts_dir: PathBuf,

    /// Prerequisite chart; defaults to managed-chart.tgz in the scripts directory.
    #[serde(default)]
    pub chart: Option<PathBuf>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default = "default_cluster_cli")]
    pub cluster_cli: String,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default)]
    pub login: Option<LoginConfig>,

    /// Defaults to state.json in the work directory.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginConfig {
    pub server: String,
    pub token: EnvValue,
}

fn default_cluster_cli() -> String {
    "oc".to_string()
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Relative paths in it are taken relative to the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(base))
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Load the explicit file if given, else the one named by `SHIPYARD_CONFIG`,
    /// else discover one in `dir`.
    pub fn locate(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        Self::discover(dir)
    }

    fn validate(&self) -> Result<()> {
        if self.cluster_cli.trim().is_empty() {
            return Err(Error::InvalidConfig("cluster_cli cannot be empty".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll_interval must be positive".to_string()));
        }
        if let Some(login) = &self.login
            && login.server.trim().is_empty()
        {
            return Err(Error::InvalidConfig("login.server cannot be empty".to_string()));
        }
        Ok(())
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let anchor = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.work_dir = anchor(self.work_dir);
        self.scripts_dir = anchor(self.scripts_dir);
        self.chart = self.chart.map(anchor);
        self.state_file = self.state_file.map(anchor);
        self
    }

    pub fn chart_path(&self) -> PathBuf {
        self.chart
            .clone()
            .unwrap_or_else(|| self.scripts_dir.join(DEFAULT_CHART))
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| self.work_dir.join(DEFAULT_STATE_FILE))
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.work_dir, &self.scripts_dir, self.chart_path())
    }
}
